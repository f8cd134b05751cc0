//! Habitual - federated Google sign-in for the Habitual tracker
//!
//! This library turns a Google identity into a Habitual application session:
//! popup sign-in with a redirect fallback, the backend token exchange, and
//! the cookie-style session jar the rest of the client reads.

pub mod auth;
pub mod config;
pub mod consumer;
pub mod error;
pub mod storage;
pub mod ui;

pub use error::{Error, Result};
