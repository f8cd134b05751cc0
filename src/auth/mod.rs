//! Federated sign-in
//!
//! This module provides:
//! - the identity provider seam and its Google implementation (popup and redirect)
//! - the backend session exchange
//! - the cookie-backed session store
//! - the sign-in bridge that coordinates them

mod callback_server;
mod flight;
mod id_token;
mod pkce;

pub mod bridge;
pub mod exchange;
#[cfg(test)]
pub(crate) mod fake;
pub mod identity;
pub mod provider;
pub mod provider_error;
pub mod session_store;

pub use bridge::{AuthBridge, AuthFailure, AuthStatus, BridgePolicy, BridgeState};
pub use exchange::{ExchangeError, HttpSessionExchange, SessionExchange};
pub use flight::{FlightStore, RedirectFlight};
pub use identity::{
    ApplicationSession, AuthOutcome, FailureReason, ProviderCredential, ProviderIdentity,
    ProviderToken, User,
};
pub use provider::{BrowserOpener, GoogleProvider, GoogleSettings, IdentityProvider};
pub use provider_error::{classify, ErrorClass, ProviderErrorCode, ProviderFailure, RecoverableReason};
pub use session_store::{CookieSessionStore, MemorySessionStore, SessionStore};
