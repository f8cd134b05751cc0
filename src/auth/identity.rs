//! Identity, session and outcome types shared by the sign-in bridge
//!
//! Provider-side values (`ProviderIdentity`, `ProviderToken`) never reach the
//! session store; only the backend-issued `ApplicationSession` is persisted.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Principal returned by the identity provider after a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIdentity {
    /// Provider-scoped subject identifier
    pub external_id: String,

    pub email: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,

    #[serde(default)]
    pub email_verified: bool,
}

impl ProviderIdentity {
    /// Check the identity at the provider boundary and normalize its fields
    ///
    /// Returns a description of the first problem found.
    pub fn validate(mut self) -> std::result::Result<Self, String> {
        self.external_id = self.external_id.trim().to_string();
        self.email = self.email.trim().to_string();

        if self.external_id.is_empty() {
            return Err("identity has no subject identifier".to_string());
        }
        if !email_pattern().is_match(&self.email) {
            return Err(format!("identity email {:?} is not a valid address", self.email));
        }

        self.display_name = self
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        self.avatar_url = self.avatar_url.filter(|url| !url.trim().is_empty());

        Ok(self)
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Short-lived bearer credential issued by the provider
///
/// Consumed by value when exchanged, so one token backs at most one exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderToken(String);

impl ProviderToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Unwrap the raw token for transmission
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderToken(<redacted>)")
    }
}

/// Identity plus the token proving it, as produced by a provider sign-in
#[derive(Debug, Clone)]
pub struct ProviderCredential {
    pub identity: ProviderIdentity,
    pub token: ProviderToken,
}

/// User record issued by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Any further fields the backend sends, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Application-level credential created by a successful exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSession {
    pub session_token: String,
    pub user: User,
}

/// Machine-readable cause of a failed sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The identity provider reported a non-recoverable error
    Provider,
    /// The backend rejected the exchange or could not be reached
    Backend,
    /// The user dismissed the provider window
    Cancelled,
    /// The session could not be persisted
    Session,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Provider => "provider",
            FailureReason::Backend => "backend",
            FailureReason::Cancelled => "cancelled",
            FailureReason::Session => "session",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result of a bridge entry point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success {
        user: User,
        session_token: String,
    },
    /// A redirect was started, or the request was absorbed by one in flight
    Pending,
    Failure {
        reason: FailureReason,
        user_message: String,
    },
}

impl AuthOutcome {
    pub fn failure(reason: FailureReason, user_message: impl Into<String>) -> Self {
        AuthOutcome::Failure {
            reason,
            user_message: user_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            AuthOutcome::Failure { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl From<ApplicationSession> for AuthOutcome {
    fn from(session: ApplicationSession) -> Self {
        AuthOutcome::Success {
            user: session.user,
            session_token: session.session_token,
        }
    }
}
