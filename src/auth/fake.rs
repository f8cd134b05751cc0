//! Scripted provider and exchange doubles
//!
//! Each call pops the next scripted result and bumps a counter, so tests can
//! assert both what the bridge did and how often it did it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::exchange::{ExchangeError, SessionExchange};
use super::identity::{ApplicationSession, ProviderCredential, ProviderIdentity, ProviderToken, User};
use super::provider::IdentityProvider;
use super::provider_error::{ProviderErrorCode, ProviderFailure};

pub fn identity(external_id: &str, email: &str) -> ProviderIdentity {
    ProviderIdentity {
        external_id: external_id.to_string(),
        email: email.to_string(),
        display_name: Some("Test User".to_string()),
        avatar_url: None,
        email_verified: true,
    }
}

pub fn credential(external_id: &str, email: &str) -> ProviderCredential {
    ProviderCredential {
        identity: identity(external_id, email),
        token: ProviderToken::new(format!("id-token-{}", external_id)),
    }
}

pub fn session(token: &str, user_id: &str) -> ApplicationSession {
    ApplicationSession {
        session_token: token.to_string(),
        user: User {
            id: user_id.to_string(),
            email: "a@b.com".to_string(),
            name: None,
            avatar: None,
            extra: Default::default(),
        },
    }
}

#[derive(Default)]
struct Calls {
    popup: AtomicUsize,
    redirect: AtomicUsize,
    redirect_result: AtomicUsize,
    sign_out: AtomicUsize,
}

/// Identity provider that replays scripted results
#[derive(Default)]
pub struct FakeIdentityProvider {
    popup_results: Mutex<VecDeque<Result<ProviderCredential, ProviderFailure>>>,
    redirect_results: Mutex<VecDeque<Result<Option<ProviderCredential>, ProviderFailure>>>,
    redirect_start_failure: Mutex<Option<ProviderFailure>>,
    current: Mutex<Option<ProviderIdentity>>,
    calls: Calls,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn popup_succeeds(self, credential: ProviderCredential) -> Self {
        self.push_popup(Ok(credential));
        self
    }

    pub fn popup_fails(self, code: ProviderErrorCode) -> Self {
        self.push_popup(Err(ProviderFailure::new(code, "scripted failure")));
        self
    }

    pub fn redirect_returns(self, result: Result<Option<ProviderCredential>, ProviderFailure>) -> Self {
        if let Ok(mut results) = self.redirect_results.lock() {
            results.push_back(result);
        }
        self
    }

    pub fn redirect_start_fails(self, code: ProviderErrorCode) -> Self {
        if let Ok(mut slot) = self.redirect_start_failure.lock() {
            *slot = Some(ProviderFailure::new(code, "scripted redirect failure"));
        }
        self
    }

    fn push_popup(&self, result: Result<ProviderCredential, ProviderFailure>) {
        if let Ok(mut results) = self.popup_results.lock() {
            results.push_back(result);
        }
    }

    pub fn popup_calls(&self) -> usize {
        self.calls.popup.load(Ordering::SeqCst)
    }

    pub fn redirect_calls(&self) -> usize {
        self.calls.redirect.load(Ordering::SeqCst)
    }

    pub fn redirect_result_calls(&self) -> usize {
        self.calls.redirect_result.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.calls.sign_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_popup(&self) -> Result<ProviderCredential, ProviderFailure> {
        self.calls.popup.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let next = self
            .popup_results
            .lock()
            .ok()
            .and_then(|mut results| results.pop_front());
        let result = next.unwrap_or_else(|| {
            Err(ProviderFailure::new(
                ProviderErrorCode::InternalError,
                "no more scripted popup results",
            ))
        });
        if let Ok(credential) = &result {
            if let Ok(mut current) = self.current.lock() {
                *current = Some(credential.identity.clone());
            }
        }
        result
    }

    async fn sign_in_redirect(&self) -> Result<(), ProviderFailure> {
        self.calls.redirect.fetch_add(1, Ordering::SeqCst);
        match self.redirect_start_failure.lock().ok().and_then(|mut slot| slot.take()) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    async fn consume_redirect_result(&self) -> Result<Option<ProviderCredential>, ProviderFailure> {
        self.calls.redirect_result.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.redirect_results
            .lock()
            .ok()
            .and_then(|mut results| results.pop_front())
            .unwrap_or(Ok(None))
    }

    fn current_identity(&self) -> Option<ProviderIdentity> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    async fn sign_out(&self) -> Result<(), ProviderFailure> {
        self.calls.sign_out.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        Ok(())
    }
}

/// Session exchange that replays scripted results
#[derive(Default)]
pub struct FakeSessionExchange {
    results: Mutex<VecDeque<Result<ApplicationSession, ExchangeError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSessionExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returns(self, result: Result<ApplicationSession, ExchangeError>) -> Self {
        if let Ok(mut results) = self.results.lock() {
            results.push_back(result);
        }
        self
    }

    /// Hold every exchange for `delay` before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of exchanges that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionExchange for FakeSessionExchange {
    async fn exchange(
        &self,
        _identity: &ProviderIdentity,
        _token: ProviderToken,
    ) -> Result<ApplicationSession, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.results
            .lock()
            .ok()
            .and_then(|mut results| results.pop_front())
            .unwrap_or_else(|| Err(ExchangeError::Transport("no more scripted exchanges".to_string())))
    }
}
