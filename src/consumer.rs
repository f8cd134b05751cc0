//! Sign-in trigger: the user-facing side of the auth bridge
//!
//! Every bridge call produces exactly one notification, except `Pending`,
//! which produces none because the application is handing over to the
//! provider.

use std::sync::Arc;

use crate::auth::{AuthBridge, AuthOutcome, FailureReason};
use crate::Result;

/// Surface for user-visible messages
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);

    fn info(&self, message: &str);

    fn error(&self, message: &str);
}

/// Moves the user to another view
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

pub struct SignInTrigger {
    bridge: Arc<AuthBridge>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    home_route: String,
}

impl SignInTrigger {
    pub fn new(
        bridge: Arc<AuthBridge>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        home_route: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            notifier,
            navigator,
            home_route: home_route.into(),
        }
    }

    pub fn bridge(&self) -> &AuthBridge {
        &self.bridge
    }

    /// Startup hook: finish a pending redirect sign-in, if any
    pub async fn bootstrap(&self) -> Option<AuthOutcome> {
        let outcome = self.bridge.resume_on_startup().await?;
        self.report(&outcome);
        Some(outcome)
    }

    /// Handle a "sign in with Google" request
    pub async fn sign_in(&self) -> AuthOutcome {
        let outcome = self.bridge.initiate_sign_in().await;
        self.report(&outcome);
        outcome
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.bridge.sign_out().await?;
        self.notifier.info("Signed out.");
        Ok(())
    }

    fn report(&self, outcome: &AuthOutcome) {
        match outcome {
            AuthOutcome::Success { user, .. } => {
                let who = user.name.as_deref().unwrap_or(&user.email);
                self.notifier.success(&format!("Welcome, {}!", who));
                self.navigator.navigate(&self.home_route);
            }
            AuthOutcome::Pending => {}
            AuthOutcome::Failure {
                reason: FailureReason::Cancelled,
                user_message,
            } => self.notifier.info(user_message),
            AuthOutcome::Failure { user_message, .. } => self.notifier.error(user_message),
        }
    }
}
