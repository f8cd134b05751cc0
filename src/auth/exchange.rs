//! Session exchange: trade a provider identity token for an application session

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::{ApplicationSession, ProviderIdentity, ProviderToken, User};

const EXCHANGE_PATH: &str = "auth/google";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("could not reach the server: {0}")]
    Transport(String),

    #[error("server rejected sign-in ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected server response: {0}")]
    Malformed(String),

    #[error("server did not answer within {0:?}")]
    Timeout(Duration),
}

/// Backend call that turns a provider credential into a session
///
/// Implementations must not retry: the token is single-use.
#[async_trait]
pub trait SessionExchange: Send + Sync {
    async fn exchange(
        &self,
        identity: &ProviderIdentity,
        token: ProviderToken,
    ) -> Result<ApplicationSession, ExchangeError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    google_user: &'a ProviderIdentity,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ExchangeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExchangeData {
    user: User,
    token: String,
}

/// Exchange client for the backend's federated-auth endpoint
#[derive(Clone)]
pub struct HttpSessionExchange {
    endpoint: String,
    http_client: Client,
}

impl HttpSessionExchange {
    pub fn new(api_base_url: &str) -> Self {
        Self::with_client(api_base_url, Client::new())
    }

    pub fn with_client(api_base_url: &str, http_client: Client) -> Self {
        Self {
            endpoint: format!("{}/{}", api_base_url.trim_end_matches('/'), EXCHANGE_PATH),
            http_client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SessionExchange for HttpSessionExchange {
    async fn exchange(
        &self,
        identity: &ProviderIdentity,
        token: ProviderToken,
    ) -> Result<ApplicationSession, ExchangeError> {
        let request = ExchangeRequest {
            google_user: identity,
            id_token: token.into_inner(),
        };

        tracing::debug!(external_id = %identity.external_id, "Exchanging provider token");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let parsed = serde_json::from_str::<ExchangeResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.map_err(|e| ExchangeError::Malformed(e.to_string()))?;
        if !parsed.success {
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                message: parsed
                    .error
                    .unwrap_or_else(|| "Authentication failed".to_string()),
            });
        }

        let data = parsed
            .data
            .ok_or_else(|| ExchangeError::Malformed("success without session data".to_string()))?;

        Ok(ApplicationSession {
            session_token: data.token,
            user: data.user,
        })
    }
}
