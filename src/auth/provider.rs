//! Identity provider client
//!
//! [`IdentityProvider`] is the seam between the sign-in bridge and a
//! third-party identity service. [`GoogleProvider`] implements it with the
//! OAuth2 authorization code flow plus PKCE:
//! - popup: the system browser plus a loopback listener for the callback
//! - redirect: a persisted flight completed from the next start's landing URL

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::callback_server::{accept_callback, bind_listener, redirect_uri, CallbackParams};
use super::flight::{FlightStore, RedirectFlight};
use super::id_token::identity_from_id_token;
use super::identity::{ProviderCredential, ProviderIdentity, ProviderToken};
use super::pkce::{generate_state, PkcePair};
use super::provider_error::{ProviderErrorCode, ProviderFailure};

/// Google OAuth2 endpoints
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

const SCOPES: &[&str] = &["openid", "email", "profile"];

/// Client for a third-party identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in through a secondary window without leaving the current page
    async fn sign_in_popup(&self) -> Result<ProviderCredential, ProviderFailure>;

    /// Hand the whole application over to the provider
    ///
    /// After `Ok(())` the current process is expected to wind down; the result
    /// arrives through [`IdentityProvider::consume_redirect_result`] on the
    /// next start.
    async fn sign_in_redirect(&self) -> Result<(), ProviderFailure>;

    /// Finish a redirect sign-in, if this start is the return leg of one
    async fn consume_redirect_result(&self) -> Result<Option<ProviderCredential>, ProviderFailure>;

    /// Principal the provider currently holds, without any I/O
    fn current_identity(&self) -> Option<ProviderIdentity>;

    async fn sign_out(&self) -> Result<(), ProviderFailure>;
}

/// Opens a URL for the user to visit
pub type BrowserOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub callback_port: u16,
    /// Where redirect sign-ins land; defaults to the loopback callback URI
    pub redirect_uri: Option<String>,
    pub popup_timeout: Duration,
    pub flight_ttl: chrono::Duration,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
}

impl GoogleSettings {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            callback_port: 8085,
            redirect_uri: None,
            popup_timeout: Duration::from_secs(120),
            flight_ttl: chrono::Duration::minutes(10),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
        }
    }

    fn redirect_target(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| redirect_uri(self.callback_port))
    }
}

#[derive(Debug, Serialize)]
struct CodeRedemption<'a> {
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    code: &'a str,
    code_verifier: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

fn failure(code: ProviderErrorCode, message: impl Into<String>) -> ProviderFailure {
    ProviderFailure::new(code, message)
}

fn internal(message: impl std::fmt::Display) -> ProviderFailure {
    failure(ProviderErrorCode::InternalError, message.to_string())
}

/// Google sign-in
pub struct GoogleProvider {
    settings: GoogleSettings,
    http_client: Client,
    flights: FlightStore,
    landing_url: Mutex<Option<Url>>,
    browser: BrowserOpener,
    popup_open: AtomicBool,
    current: RwLock<Option<ProviderIdentity>>,
    access_token: Mutex<Option<String>>,
}

impl GoogleProvider {
    /// `landing_url` is the URL this start was launched with, if any
    pub fn new(settings: GoogleSettings, flights: FlightStore, landing_url: Option<Url>) -> Self {
        Self {
            settings,
            http_client: Client::new(),
            flights,
            landing_url: Mutex::new(landing_url),
            browser: Arc::new(|url: &str| -> std::io::Result<()> { open::that(url) }),
            popup_open: AtomicBool::new(false),
            current: RwLock::new(None),
            access_token: Mutex::new(None),
        }
    }

    /// Replace the system browser launcher
    pub fn with_browser(mut self, browser: BrowserOpener) -> Self {
        self.browser = browser;
        self
    }

    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        code_challenge: &str,
        state: &str,
    ) -> Result<String, ProviderFailure> {
        let mut url = Url::parse(&self.settings.auth_url).map_err(|e| {
            failure(
                ProviderErrorCode::Other("auth/invalid-auth-url".to_string()),
                format!("invalid authorization URL: {}", e),
            )
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", state)
            .append_pair("prompt", "select_account");

        Ok(url.to_string())
    }

    async fn run_popup(&self) -> Result<ProviderCredential, ProviderFailure> {
        let listener = bind_listener(self.settings.callback_port).await.map_err(|e| {
            failure(
                ProviderErrorCode::OperationNotSupported,
                format!(
                    "cannot receive the sign-in window's callback on port {}: {}",
                    self.settings.callback_port, e
                ),
            )
        })?;
        let port = listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.settings.callback_port);
        let redirect_uri = redirect_uri(port);

        let pkce = PkcePair::new();
        let state = generate_state();
        let url = self.authorization_url(&redirect_uri, &pkce.challenge, &state)?;

        (self.browser)(&url).map_err(|e| {
            failure(
                ProviderErrorCode::PopupBlocked,
                format!("could not open the sign-in window: {}", e),
            )
        })?;

        let params = match tokio::time::timeout(self.settings.popup_timeout, accept_callback(&listener)).await {
            Err(_) => {
                return Err(failure(
                    ProviderErrorCode::PopupClosedByUser,
                    "the sign-in window was closed before completing",
                ))
            }
            Ok(Err(e)) => return Err(internal(format!("sign-in callback failed: {}", e))),
            Ok(Ok(params)) => params,
        };

        if let Some(error) = params.error.as_deref() {
            let code = if error == "access_denied" {
                ProviderErrorCode::PopupClosedByUser
            } else {
                ProviderErrorCode::InternalError
            };
            return Err(failure(code, params.error_text().unwrap_or_default()));
        }

        let code = checked_code(params, &state)?;
        self.redeem_code(&code, &pkce.verifier, &redirect_uri).await
    }

    /// Trade an authorization code for tokens and read the identity
    async fn redeem_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<ProviderCredential, ProviderFailure> {
        let request = CodeRedemption {
            client_id: &self.settings.client_id,
            client_secret: self.settings.client_secret.as_deref(),
            code,
            code_verifier,
            redirect_uri,
            grant_type: "authorization_code",
        };

        let response = self
            .http_client
            .post(&self.settings.token_url)
            .form(&request)
            .send()
            .await
            .map_err(|e| failure(ProviderErrorCode::NetworkRequestFailed, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(failure(
                ProviderErrorCode::InvalidCredential,
                format!("token endpoint returned {}: {}", status, body),
            ));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| failure(ProviderErrorCode::InvalidCredential, e.to_string()))?;
        let id_token = tokens.id_token.ok_or_else(|| {
            failure(
                ProviderErrorCode::InvalidCredential,
                "token endpoint returned no ID token",
            )
        })?;
        let identity = identity_from_id_token(&id_token, &self.settings.client_id)
            .map_err(|e| failure(ProviderErrorCode::InvalidCredential, e))?;

        if let Ok(mut current) = self.current.write() {
            *current = Some(identity.clone());
        }
        if let Ok(mut access_token) = self.access_token.lock() {
            *access_token = Some(tokens.access_token);
        }
        tracing::debug!(external_id = %identity.external_id, "Provider sign-in completed");

        Ok(ProviderCredential {
            identity,
            token: ProviderToken::new(id_token),
        })
    }
}

/// Marks the sign-in window closed however the popup flow ends
struct PopupSlot<'a>(&'a AtomicBool);

impl Drop for PopupSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The authorization code, provided the state matches the one we sent
fn checked_code(params: CallbackParams, expected_state: &str) -> Result<String, ProviderFailure> {
    match params.state.as_deref() {
        Some(state) if state == expected_state => {}
        _ => {
            return Err(failure(
                ProviderErrorCode::MissingOrInvalidNonce,
                "sign-in callback state does not match",
            ))
        }
    }
    params
        .code
        .ok_or_else(|| internal("sign-in callback carried no authorization code"))
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    async fn sign_in_popup(&self) -> Result<ProviderCredential, ProviderFailure> {
        if self.popup_open.swap(true, Ordering::SeqCst) {
            return Err(failure(
                ProviderErrorCode::CancelledPopupRequest,
                "another sign-in window is already open",
            ));
        }
        let _slot = PopupSlot(&self.popup_open);
        self.run_popup().await
    }

    async fn sign_in_redirect(&self) -> Result<(), ProviderFailure> {
        let pkce = PkcePair::new();
        let state = generate_state();
        let redirect_uri = self.settings.redirect_target();
        let url = self.authorization_url(&redirect_uri, &pkce.challenge, &state)?;

        let flight = RedirectFlight::new(state, pkce.verifier, redirect_uri);
        self.flights
            .save(&flight)
            .map_err(|e| internal(format!("could not record the redirect sign-in: {}", e)))?;
        tracing::info!(flight = %flight.id, "Redirect sign-in started");

        // the flight is recorded, so a user who opens the URL by hand still completes
        if let Err(e) = (self.browser)(&url) {
            tracing::warn!(%url, "Failed to open browser for redirect sign-in: {}", e);
        }
        Ok(())
    }

    async fn consume_redirect_result(&self) -> Result<Option<ProviderCredential>, ProviderFailure> {
        let landing = self
            .landing_url
            .lock()
            .map_err(|_| internal("landing URL lock poisoned"))?
            .take();
        let params = landing
            .as_ref()
            .map(CallbackParams::from_url)
            .filter(CallbackParams::is_callback);
        let flight = self.flights.peek().map_err(internal)?;

        let (flight, params) = match (flight, params) {
            (None, None) => return Ok(None),
            (Some(flight), None) => {
                if flight.is_expired(self.settings.flight_ttl) {
                    tracing::info!(flight = %flight.id, "Discarding expired redirect sign-in");
                    self.flights.discard().map_err(internal)?;
                } else {
                    tracing::debug!(flight = %flight.id, "Redirect sign-in still awaiting its return leg");
                }
                return Ok(None);
            }
            (None, Some(_)) => {
                return Err(failure(
                    ProviderErrorCode::MissingOrInvalidNonce,
                    "sign-in callback does not belong to a sign-in started here",
                ))
            }
            (Some(flight), Some(params)) => (flight, params),
        };

        self.flights.discard().map_err(internal)?;

        if flight.is_expired(self.settings.flight_ttl) {
            return Err(failure(
                ProviderErrorCode::Timeout,
                "the redirect sign-in took too long to complete",
            ));
        }
        if let Some(error) = params.error.as_deref() {
            let code = if error == "access_denied" {
                ProviderErrorCode::UserCancelled
            } else {
                ProviderErrorCode::InternalError
            };
            return Err(failure(code, params.error_text().unwrap_or_default()));
        }

        let code = checked_code(params, &flight.state)?;
        self.redeem_code(&code, &flight.code_verifier, &flight.redirect_uri)
            .await
            .map(Some)
    }

    fn current_identity(&self) -> Option<ProviderIdentity> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    async fn sign_out(&self) -> Result<(), ProviderFailure> {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
        self.flights.discard().map_err(internal)?;

        let access_token = self.access_token.lock().ok().and_then(|mut t| t.take());
        if let Some(token) = access_token {
            let response = self
                .http_client
                .post(&self.settings.revoke_url)
                .form(&[("token", token.as_str())])
                .send()
                .await
                .map_err(|e| failure(ProviderErrorCode::NetworkRequestFailed, e.to_string()))?;
            if !response.status().is_success() {
                return Err(internal(format!("token revocation returned {}", response.status())));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::id_token::encode_test_token;
    use crate::auth::provider_error::{classify, ErrorClass};
    use serde_json::json;
    use tokio::io::AsyncWriteExt;

    const CLIENT_ID: &str = "client-1";

    fn id_token() -> String {
        encode_test_token(json!({
            "sub": "g1",
            "aud": CLIENT_ID,
            "exp": chrono::Utc::now().timestamp() + 3600,
            "email": "a@b.com",
            "email_verified": true,
            "name": "Ada"
        }))
    }

    fn settings(server_url: &str) -> GoogleSettings {
        let mut settings = GoogleSettings::new(CLIENT_ID);
        settings.callback_port = 0;
        settings.popup_timeout = Duration::from_millis(300);
        settings.token_url = format!("{}/token", server_url);
        settings.revoke_url = format!("{}/revoke", server_url);
        settings
    }

    fn recording_browser() -> (BrowserOpener, Arc<Mutex<Vec<String>>>) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = opened.clone();
        let browser: BrowserOpener = Arc::new(move |url: &str| -> std::io::Result<()> {
            sink.lock().unwrap().push(url.to_string());
            Ok(())
        });
        (browser, opened)
    }

    fn query_param(url: &str, key: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_authorization_url() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(
            GoogleSettings::new(CLIENT_ID),
            FlightStore::new(dir.path().join("flight.json")),
            None,
        );
        let url = provider
            .authorization_url("http://127.0.0.1:8085/callback", "challenge", "state-1")
            .unwrap();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert_eq!(query_param(&url, "client_id").as_deref(), Some(CLIENT_ID));
        assert_eq!(query_param(&url, "scope").as_deref(), Some("openid email profile"));
        assert_eq!(query_param(&url, "code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(query_param(&url, "state").as_deref(), Some("state-1"));
    }

    #[tokio::test]
    async fn test_redirect_round_trip_across_starts() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(json!({ "access_token": "at", "id_token": id_token() }).to_string())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let flight_path = dir.path().join("flight.json");

        // first start: begin the redirect
        let (browser, opened) = recording_browser();
        let first = GoogleProvider::new(settings(&server.url()), FlightStore::new(&flight_path), None)
            .with_browser(browser);
        first.sign_in_redirect().await.unwrap();
        assert!(flight_path.exists());

        let auth_url = opened.lock().unwrap()[0].clone();
        let state = query_param(&auth_url, "state").unwrap();

        // second start: launched on the callback URL
        let landing = Url::parse(&format!(
            "http://127.0.0.1:8085/callback?code=c1&state={}",
            state
        ))
        .unwrap();
        let second = GoogleProvider::new(
            settings(&server.url()),
            FlightStore::new(&flight_path),
            Some(landing),
        );
        let credential = second.consume_redirect_result().await.unwrap().unwrap();

        assert_eq!(credential.identity.external_id, "g1");
        assert_eq!(second.current_identity(), Some(credential.identity.clone()));
        assert!(!flight_path.exists());

        // the result is consumed once
        assert!(second.consume_redirect_result().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plain_start_is_not_a_redirect_return() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(
            GoogleSettings::new(CLIENT_ID),
            FlightStore::new(dir.path().join("flight.json")),
            Some(Url::parse("http://127.0.0.1:8085/").unwrap()),
        );
        assert!(provider.consume_redirect_result().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_flight_survives_a_start_without_callback() {
        let dir = tempfile::tempdir().unwrap();
        let flights = FlightStore::new(dir.path().join("flight.json"));
        flights
            .save(&RedirectFlight::new("s".into(), "v".into(), "r".into()))
            .unwrap();

        let provider = GoogleProvider::new(GoogleSettings::new(CLIENT_ID), flights.clone(), None);
        assert!(provider.consume_redirect_result().await.unwrap().is_none());
        assert!(flights.peek().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_redirect_state_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let flights = FlightStore::new(dir.path().join("flight.json"));
        flights
            .save(&RedirectFlight::new("expected".into(), "v".into(), "r".into()))
            .unwrap();
        let landing = Url::parse("http://127.0.0.1:8085/callback?code=c&state=forged").unwrap();

        let provider = GoogleProvider::new(GoogleSettings::new(CLIENT_ID), flights.clone(), Some(landing));
        let err = provider.consume_redirect_result().await.unwrap_err();

        assert_eq!(err.code, ProviderErrorCode::MissingOrInvalidNonce);
        assert_eq!(classify(&err.code), ErrorClass::Fatal);
        assert!(flights.peek().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redirect_denied_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let flights = FlightStore::new(dir.path().join("flight.json"));
        flights
            .save(&RedirectFlight::new("s".into(), "v".into(), "r".into()))
            .unwrap();
        let landing = Url::parse("http://127.0.0.1:8085/callback?error=access_denied&state=s").unwrap();

        let provider = GoogleProvider::new(GoogleSettings::new(CLIENT_ID), flights, Some(landing));
        let err = provider.consume_redirect_result().await.unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::UserCancelled);
    }

    #[tokio::test]
    async fn test_popup_blocked_when_browser_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(
            settings("http://127.0.0.1:1"),
            FlightStore::new(dir.path().join("flight.json")),
            None,
        )
        .with_browser(Arc::new(|_: &str| -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))
        }));

        let err = provider.sign_in_popup().await.unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::PopupBlocked);
    }

    #[tokio::test]
    async fn test_popup_times_out_as_closed_window() {
        let dir = tempfile::tempdir().unwrap();
        let (browser, _) = recording_browser();
        let provider = GoogleProvider::new(
            settings("http://127.0.0.1:1"),
            FlightStore::new(dir.path().join("flight.json")),
            None,
        )
        .with_browser(browser);

        let err = provider.sign_in_popup().await.unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::PopupClosedByUser);
    }

    #[tokio::test]
    async fn test_abandoned_popup_frees_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (browser, opened) = recording_browser();
        let provider = GoogleProvider::new(
            settings("http://127.0.0.1:1"),
            FlightStore::new(dir.path().join("flight.json")),
            None,
        )
        .with_browser(browser);

        let abandoned = tokio::time::timeout(Duration::from_millis(50), provider.sign_in_popup()).await;
        assert!(abandoned.is_err());

        // a fresh popup runs instead of being refused as a duplicate
        let err = provider.sign_in_popup().await.unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::PopupClosedByUser);
        assert_eq!(opened.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_redirect_starts_even_if_browser_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let flights = FlightStore::new(dir.path().join("flight.json"));
        let provider = GoogleProvider::new(settings("http://127.0.0.1:1"), flights.clone(), None)
            .with_browser(Arc::new(|_: &str| -> std::io::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))
            }));

        provider.sign_in_redirect().await.unwrap();
        assert!(flights.peek().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_popup_completes_through_loopback() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(json!({ "access_token": "at", "id_token": id_token() }).to_string())
            .create_async()
            .await;

        // the "user" follows the authorization URL straight back to the loopback
        let browser: BrowserOpener = Arc::new(|url: &str| -> std::io::Result<()> {
            let redirect = query_param(url, "redirect_uri").unwrap();
            let state = query_param(url, "state").unwrap();
            let addr = Url::parse(&redirect).unwrap().socket_addrs(|| None).unwrap()[0];
            tokio::spawn(async move {
                let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
                let request = format!("GET /callback?code=c1&state={} HTTP/1.1\r\n\r\n", state);
                stream.write_all(request.as_bytes()).await.unwrap();
            });
            Ok(())
        });

        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&server.url());
        settings.popup_timeout = Duration::from_secs(5);
        let provider = GoogleProvider::new(settings, FlightStore::new(dir.path().join("flight.json")), None)
            .with_browser(browser);

        let credential = provider.sign_in_popup().await.unwrap();
        assert_eq!(credential.identity.email, "a@b.com");
        assert!(provider.current_identity().is_some());
    }

    #[tokio::test]
    async fn test_sign_out_revokes_and_forgets() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(json!({ "access_token": "at-1", "id_token": id_token() }).to_string())
            .create_async()
            .await;
        let revoke = server
            .mock("POST", "/revoke")
            .match_body(mockito::Matcher::UrlEncoded("token".into(), "at-1".into()))
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(
            settings(&server.url()),
            FlightStore::new(dir.path().join("flight.json")),
            None,
        );
        provider.redeem_code("c1", "v", "r").await.unwrap();
        assert!(provider.current_identity().is_some());

        provider.sign_out().await.unwrap();
        revoke.assert_async().await;
        assert!(provider.current_identity().is_none());
    }
}
