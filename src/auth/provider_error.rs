//! Provider error codes and their classification
//!
//! Identity providers report failures as string codes. The bridge only cares
//! whether a failure can be recovered by switching to the redirect flow, which
//! [`classify`] decides without touching the provider.

use std::fmt;

use thiserror::Error;

/// Error codes an identity provider can report
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    PopupBlocked,
    PopupClosedByUser,
    CancelledPopupRequest,
    /// The popup window cannot communicate with the opener
    OperationNotSupported,
    NetworkRequestFailed,
    InvalidCredential,
    UserCancelled,
    MissingOrInvalidNonce,
    Timeout,
    InternalError,
    Other(String),
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderErrorCode::PopupBlocked => "auth/popup-blocked",
            ProviderErrorCode::PopupClosedByUser => "auth/popup-closed-by-user",
            ProviderErrorCode::CancelledPopupRequest => "auth/cancelled-popup-request",
            ProviderErrorCode::OperationNotSupported => {
                "auth/operation-not-supported-in-this-environment"
            }
            ProviderErrorCode::NetworkRequestFailed => "auth/network-request-failed",
            ProviderErrorCode::InvalidCredential => "auth/invalid-credential",
            ProviderErrorCode::UserCancelled => "auth/user-cancelled",
            ProviderErrorCode::MissingOrInvalidNonce => "auth/missing-or-invalid-nonce",
            ProviderErrorCode::Timeout => "auth/timeout",
            ProviderErrorCode::InternalError => "auth/internal-error",
            ProviderErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an identity provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProviderFailure {
    pub code: ProviderErrorCode,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        classify(&self.code)
    }
}

/// Why a popup sign-in can be retried through the redirect flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverableReason {
    PopupBlocked,
    PopupClosedByUser,
    CancelledPopupRequest,
    IsolationPolicy,
}

impl RecoverableReason {
    /// True when the user dismissed the popup themselves
    pub fn is_user_dismissal(&self) -> bool {
        matches!(
            self,
            RecoverableReason::PopupClosedByUser | RecoverableReason::CancelledPopupRequest
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Recoverable(RecoverableReason),
    Fatal,
}

/// Classify a provider error code
pub fn classify(code: &ProviderErrorCode) -> ErrorClass {
    match code {
        ProviderErrorCode::PopupBlocked => ErrorClass::Recoverable(RecoverableReason::PopupBlocked),
        ProviderErrorCode::PopupClosedByUser => {
            ErrorClass::Recoverable(RecoverableReason::PopupClosedByUser)
        }
        ProviderErrorCode::CancelledPopupRequest => {
            ErrorClass::Recoverable(RecoverableReason::CancelledPopupRequest)
        }
        ProviderErrorCode::OperationNotSupported => {
            ErrorClass::Recoverable(RecoverableReason::IsolationPolicy)
        }
        ProviderErrorCode::NetworkRequestFailed
        | ProviderErrorCode::InvalidCredential
        | ProviderErrorCode::UserCancelled
        | ProviderErrorCode::MissingOrInvalidNonce
        | ProviderErrorCode::Timeout
        | ProviderErrorCode::InternalError
        | ProviderErrorCode::Other(_) => ErrorClass::Fatal,
    }
}
