//! Error types for Habitual

use thiserror::Error;

/// Result type alias for Habitual operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the sign-in bridge's outcome channel
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session store error: {0}")]
    Store(String),
}

