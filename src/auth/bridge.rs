//! Auth bridge: the sign-in state machine
//!
//! ```text
//!  Idle ──► Attempting ──► Exchanging ──► Succeeded
//!               │               │
//!               │               └──► Failed
//!               ├──► FallingBack ──► Redirected (process winds down)
//!               └──► Failed
//! ```
//!
//! Two entry points drive it. [`AuthBridge::initiate_sign_in`] is the
//! interactive path: popup first, redirect when the popup cannot be used.
//! [`AuthBridge::resume_on_startup`] runs once per start and completes a
//! redirect sign-in begun by an earlier process. The entry points share no
//! in-memory state about an attempt; the provider's redirect store and the
//! session store are the only links between them.
//!
//! Interactive requests wait while startup resumption is running and are
//! refused with `Pending` if it has not been started. At most one attempt
//! runs at a time, and a sign-out discards whatever attempt is in flight.
//! Neither entry point returns an error: everything is folded into an
//! [`AuthOutcome`].

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use super::exchange::{ExchangeError, SessionExchange};
use super::identity::{
    ApplicationSession, AuthOutcome, FailureReason, ProviderCredential, ProviderIdentity, User,
};
use super::provider::IdentityProvider;
use super::provider_error::{ErrorClass, ProviderErrorCode, ProviderFailure, RecoverableReason};
use super::session_store::SessionStore;
use crate::error::Error;
use crate::Result;

pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BridgePolicy {
    /// Upper bound on a single backend exchange
    pub exchange_timeout: Duration,

    /// Whether a popup the user closed still falls back to a redirect
    pub fallback_on_popup_closed: bool,
}

impl Default for BridgePolicy {
    fn default() -> Self {
        Self {
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            fallback_on_popup_closed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    Idle,
    Attempting,
    FallingBack,
    Redirected,
    Exchanging,
    Succeeded,
    Failed,
}

impl BridgeState {
    /// An attempt is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            BridgeState::Attempting | BridgeState::FallingBack | BridgeState::Exchanging
        )
    }

    pub fn can_transition_to(&self, next: BridgeState) -> bool {
        use BridgeState::*;

        match (*self, next) {
            // sign-out resets from anywhere
            (_, Idle) => true,
            (Idle | Redirected | Succeeded | Failed, Attempting | Exchanging | Failed) => true,
            (Attempting, Exchanging | FallingBack | Failed) => true,
            (FallingBack, Redirected | Failed) => true,
            (Exchanging, Succeeded | Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthFailure {
    pub reason: FailureReason,
    pub user_message: String,
}

/// Application-wide view of authentication
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthStatus {
    /// User of the stored session, if any
    pub user: Option<User>,

    /// Failure of the most recent attempt, cleared by the next success
    pub last_failure: Option<AuthFailure>,
}

impl AuthStatus {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Startup {
    NotStarted,
    Running,
    Done,
}

/// Sign-in context, built once per start and shared by reference
pub struct AuthBridge {
    provider: Arc<dyn IdentityProvider>,
    exchange: Arc<dyn SessionExchange>,
    store: Arc<dyn SessionStore>,
    policy: BridgePolicy,
    state: Mutex<BridgeState>,
    status: RwLock<AuthStatus>,
    startup: watch::Sender<Startup>,
    /// Bumped by every sign-out; attempts from an older generation may not store
    generation: Mutex<u64>,
}

/// Claim on the bridge held for the length of one attempt
///
/// Dropped before the attempt settles (the caller gave up on its future),
/// it hands the bridge back as `Idle`.
struct Attempt<'a> {
    bridge: &'a AuthBridge,
    generation: u64,
}

impl Attempt<'_> {
    /// False once a sign-out has overtaken this attempt
    fn is_current(&self) -> bool {
        self.bridge
            .generation
            .lock()
            .map(|generation| *generation == self.generation)
            .unwrap_or(false)
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.bridge.state.lock() {
            if state.is_busy() {
                tracing::debug!(from = ?*state, "Attempt abandoned, releasing the bridge");
                *state = BridgeState::Idle;
            }
        }
    }
}

/// Marks startup resumption finished however `resume_on_startup` ends
struct StartupDone<'a>(&'a watch::Sender<Startup>);

impl Drop for StartupDone<'_> {
    fn drop(&mut self) {
        self.0.send_replace(Startup::Done);
    }
}

impl AuthBridge {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        exchange: Arc<dyn SessionExchange>,
        store: Arc<dyn SessionStore>,
        policy: BridgePolicy,
    ) -> Self {
        let user = match store.load() {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                tracing::warn!("Could not read stored session: {}", e);
                None
            }
        };
        let (startup, _) = watch::channel(Startup::NotStarted);

        Self {
            provider,
            exchange,
            store,
            policy,
            state: Mutex::new(BridgeState::Idle),
            status: RwLock::new(AuthStatus {
                user,
                last_failure: None,
            }),
            startup,
            generation: Mutex::new(0),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(BridgeState::Idle)
    }

    pub fn status(&self) -> AuthStatus {
        self.status
            .read()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    pub fn current_session(&self) -> Result<Option<ApplicationSession>> {
        self.store.load()
    }

    pub fn current_identity(&self) -> Option<ProviderIdentity> {
        self.provider.current_identity()
    }

    /// Complete a redirect sign-in started by an earlier process
    ///
    /// Must be called once per start, before anything depends on auth state.
    /// Returns `None` when this start is not the return leg of a redirect,
    /// and on any call after the first.
    pub async fn resume_on_startup(&self) -> Option<AuthOutcome> {
        let claimed = self.startup.send_if_modified(|phase| {
            if *phase == Startup::NotStarted {
                *phase = Startup::Running;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::warn!("Startup resumption already ran, ignoring");
            return None;
        }

        let _done = StartupDone(&self.startup);
        let outcome = self.resume().await;
        if let Some(outcome) = &outcome {
            self.record(outcome);
        }
        outcome
    }

    async fn resume(&self) -> Option<AuthOutcome> {
        match self.provider.consume_redirect_result().await {
            Ok(None) => {
                tracing::debug!("No redirect sign-in to resume");
                None
            }
            Err(failure) => {
                tracing::warn!(code = %failure.code, "Redirect sign-in failed: {}", failure.message);
                self.transition(BridgeState::Failed);
                Some(AuthOutcome::failure(
                    FailureReason::Provider,
                    provider_message(&failure),
                ))
            }
            Ok(Some(credential)) => {
                tracing::info!("Resuming redirect sign-in");
                let Some(attempt) = self.begin(BridgeState::Exchanging) else {
                    return Some(AuthOutcome::Pending);
                };
                Some(self.complete_exchange(&attempt, credential).await)
            }
        }
    }

    /// Run an interactive sign-in
    ///
    /// Queued behind a running startup resumption. Returns `Pending` without
    /// doing anything when resumption has not been started yet, or when
    /// another attempt is already in flight.
    pub async fn initiate_sign_in(&self) -> AuthOutcome {
        if !self.wait_for_startup().await {
            tracing::warn!("Sign-in requested before startup resumption, ignoring request");
            return AuthOutcome::Pending;
        }

        let Some(attempt) = self.begin(BridgeState::Attempting) else {
            tracing::debug!(state = ?self.state(), "Sign-in already in progress, ignoring request");
            return AuthOutcome::Pending;
        };

        let outcome = self.attempt(&attempt).await;
        self.record(&outcome);
        outcome
    }

    async fn attempt(&self, attempt: &Attempt<'_>) -> AuthOutcome {
        let failure = match self.provider.sign_in_popup().await {
            Ok(credential) => {
                self.transition(BridgeState::Exchanging);
                return self.complete_exchange(attempt, credential).await;
            }
            Err(failure) => failure,
        };

        match failure.class() {
            ErrorClass::Recoverable(reason)
                if reason.is_user_dismissal() && !self.policy.fallback_on_popup_closed =>
            {
                tracing::info!(code = %failure.code, "Sign-in window dismissed by the user");
                self.transition(BridgeState::Failed);
                AuthOutcome::failure(FailureReason::Cancelled, "Sign-in was cancelled.")
            }
            ErrorClass::Recoverable(reason) => self.fall_back(attempt, reason, &failure).await,
            ErrorClass::Fatal => {
                tracing::warn!(code = %failure.code, "Popup sign-in failed: {}", failure.message);
                self.transition(BridgeState::Failed);
                AuthOutcome::failure(FailureReason::Provider, provider_message(&failure))
            }
        }
    }

    async fn fall_back(
        &self,
        attempt: &Attempt<'_>,
        reason: RecoverableReason,
        cause: &ProviderFailure,
    ) -> AuthOutcome {
        if !attempt.is_current() {
            return self.superseded();
        }
        self.transition(BridgeState::FallingBack);
        tracing::info!(?reason, code = %cause.code, "Popup unavailable, falling back to redirect sign-in");

        match self.provider.sign_in_redirect().await {
            Ok(()) => {
                self.transition(BridgeState::Redirected);
                AuthOutcome::Pending
            }
            Err(failure) => {
                tracing::warn!(code = %failure.code, "Redirect sign-in could not start: {}", failure.message);
                self.transition(BridgeState::Failed);
                AuthOutcome::failure(FailureReason::Provider, provider_message(&failure))
            }
        }
    }

    /// Trade the provider credential for a session and store it
    ///
    /// Expects the bridge to be in `Exchanging`.
    async fn complete_exchange(
        &self,
        attempt: &Attempt<'_>,
        credential: ProviderCredential,
    ) -> AuthOutcome {
        if !attempt.is_current() {
            return self.superseded();
        }
        let ProviderCredential { identity, token } = credential;

        let exchanged = tokio::time::timeout(
            self.policy.exchange_timeout,
            self.exchange.exchange(&identity, token),
        )
        .await
        .unwrap_or(Err(ExchangeError::Timeout(self.policy.exchange_timeout)));

        let session = match exchanged {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(external_id = %identity.external_id, "Session exchange failed: {}", e);
                self.transition(BridgeState::Failed);
                return AuthOutcome::failure(FailureReason::Backend, exchange_message(&e));
            }
        };

        // checked and saved under the generation lock so a sign-out cannot slip in between
        let saved = match self.generation.lock() {
            Ok(generation) if *generation == attempt.generation => Some(self.store.save(&session)),
            _ => None,
        };
        let Some(saved) = saved else {
            return self.superseded();
        };
        if let Err(e) = saved {
            tracing::error!("Could not persist session: {}", e);
            self.transition(BridgeState::Failed);
            return AuthOutcome::failure(
                FailureReason::Session,
                "Signed in, but the session could not be saved on this device.",
            );
        }

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.transition(BridgeState::Succeeded);
        session.into()
    }

    /// End the application session and the provider session
    ///
    /// The stored session goes first; if it cannot be removed nothing else is
    /// touched. An attempt still in flight keeps the bridge busy until it
    /// settles, and its result is discarded.
    pub async fn sign_out(&self) -> Result<()> {
        {
            let mut generation = self
                .generation
                .lock()
                .map_err(|_| Error::Store("sign-out lock poisoned".to_string()))?;
            self.store.clear()?;
            *generation += 1;
        }

        if let Ok(mut status) = self.status.write() {
            *status = AuthStatus::default();
        }
        if let Ok(mut state) = self.state.lock() {
            if state.is_busy() {
                tracing::info!(state = ?*state, "Signing out during a sign-in, its result will be discarded");
            } else {
                *state = BridgeState::Idle;
            }
        }

        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!("Provider sign-out failed: {}", e);
        }
        tracing::info!("Signed out");
        Ok(())
    }

    /// Wait out a running startup resumption; false if it was never started
    async fn wait_for_startup(&self) -> bool {
        let mut phase = self.startup.subscribe();
        let current = *phase.borrow();
        match current {
            Startup::Done => true,
            Startup::NotStarted => false,
            Startup::Running => {
                tracing::debug!("Sign-in queued behind startup resumption");
                phase.wait_for(|phase| *phase == Startup::Done).await.is_ok()
            }
        }
    }

    /// Claim the bridge for a new attempt unless one is already running
    fn begin(&self, next: BridgeState) -> Option<Attempt<'_>> {
        let generation = self.generation.lock().map(|generation| *generation).ok()?;
        let mut state = self.state.lock().ok()?;
        if state.is_busy() {
            return None;
        }
        tracing::debug!(from = ?*state, to = ?next, "Bridge transition");
        *state = next;
        Some(Attempt {
            bridge: self,
            generation,
        })
    }

    fn superseded(&self) -> AuthOutcome {
        tracing::info!("Sign-in overtaken by a sign-out, discarding its result");
        self.transition(BridgeState::Failed);
        AuthOutcome::failure(FailureReason::Cancelled, "Signed out before sign-in finished.")
    }

    fn transition(&self, next: BridgeState) {
        if let Ok(mut state) = self.state.lock() {
            if !state.can_transition_to(next) {
                tracing::warn!(from = ?*state, to = ?next, "Unexpected bridge transition");
            }
            tracing::debug!(from = ?*state, to = ?next, "Bridge transition");
            *state = next;
        }
    }

    fn record(&self, outcome: &AuthOutcome) {
        let Ok(mut status) = self.status.write() else {
            return;
        };
        match outcome {
            AuthOutcome::Success { user, .. } => {
                status.user = Some(user.clone());
                status.last_failure = None;
            }
            AuthOutcome::Failure {
                reason,
                user_message,
            } => {
                status.last_failure = Some(AuthFailure {
                    reason: *reason,
                    user_message: user_message.clone(),
                });
            }
            AuthOutcome::Pending => {}
        }
    }
}

fn provider_message(failure: &ProviderFailure) -> String {
    match failure.code {
        ProviderErrorCode::NetworkRequestFailed => {
            "Could not reach Google. Check your connection and try again.".to_string()
        }
        ProviderErrorCode::UserCancelled => "Sign-in was cancelled.".to_string(),
        ProviderErrorCode::Timeout => "Sign-in took too long. Please try again.".to_string(),
        _ => format!("Google sign-in failed: {}", failure.message),
    }
}

fn exchange_message(error: &ExchangeError) -> String {
    match error {
        ExchangeError::Rejected { message, .. } => message.clone(),
        ExchangeError::Timeout(_) => {
            "The server took too long to respond. Please try again.".to_string()
        }
        ExchangeError::Transport(_) => "Could not reach the server. Please try again.".to_string(),
        ExchangeError::Malformed(_) => "Unexpected response from the server.".to_string(),
    }
}
