//! Redirect flights: sign-in state that outlives the process
//!
//! A redirect sign-in leaves the application before the provider answers, so
//! the PKCE verifier and CSRF state are written to disk and picked up by the
//! next start.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::write_private_atomic;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectFlight {
    pub id: Uuid,
    pub state: String,
    pub code_verifier: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
}

impl RedirectFlight {
    pub fn new(state: String, code_verifier: String, redirect_uri: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            code_verifier,
            redirect_uri,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() >= self.created_at + ttl
    }
}

/// File holding at most one pending flight
#[derive(Debug, Clone)]
pub struct FlightStore {
    path: PathBuf,
}

impl FlightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a flight, replacing any earlier one
    pub fn save(&self, flight: &RedirectFlight) -> Result<()> {
        let content = serde_json::to_vec_pretty(flight)?;
        write_private_atomic(&self.path, &content)
    }

    pub fn peek(&self) -> Result<Option<RedirectFlight>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read(&self.path)?;
        match serde_json::from_slice(&content) {
            Ok(flight) => Ok(Some(flight)),
            Err(e) => {
                tracing::warn!("Discarding unreadable redirect flight: {}", e);
                self.discard()?;
                Ok(None)
            }
        }
    }

    pub fn discard(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
