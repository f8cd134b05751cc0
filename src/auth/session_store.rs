//! Session store: where the application session lives between starts
//!
//! The session is kept as two cookies, `auth_token` and `user_data`, written
//! together. A reader sees both cookies of one session or no session.

use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{ApplicationSession, User};
use crate::error::Error;
use crate::storage::write_private_atomic;
use crate::Result;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";
pub const USER_DATA_COOKIE: &str = "user_data";

/// Persistence for the single current application session
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<ApplicationSession>>;

    /// Replace whatever session is stored
    fn save(&self, session: &ApplicationSession) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
    pub same_site: SameSite,
    pub secure: bool,
}

impl SessionCookie {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CookieJar {
    cookies: Vec<SessionCookie>,
}

impl CookieJar {
    fn get(&self, name: &str) -> Option<&SessionCookie> {
        self.cookies
            .iter()
            .find(|cookie| cookie.name == name && !cookie.is_expired())
    }
}

/// Cookie jar file holding the session cookies
pub struct CookieSessionStore {
    path: PathBuf,
    ttl: Duration,
    secure: bool,
}

impl CookieSessionStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, secure: bool) -> Self {
        Self {
            path: path.into(),
            ttl,
            secure,
        }
    }

    fn cookie(&self, name: &str, value: String, expires_at: DateTime<Utc>) -> SessionCookie {
        SessionCookie {
            name: name.to_string(),
            value,
            path: "/".to_string(),
            expires_at,
            same_site: SameSite::Lax,
            secure: self.secure,
        }
    }

    fn read_jar(&self) -> Result<Option<CookieJar>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    /// Raw cookies as stored, expired ones included
    pub fn cookies(&self) -> Result<Vec<SessionCookie>> {
        Ok(self.read_jar()?.map(|jar| jar.cookies).unwrap_or_default())
    }
}

impl SessionStore for CookieSessionStore {
    fn load(&self) -> Result<Option<ApplicationSession>> {
        let jar = match self.read_jar() {
            Ok(Some(jar)) => jar,
            Ok(None) => return Ok(None),
            Err(Error::Json(e)) => {
                tracing::warn!("Ignoring unreadable session jar: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let (token, user_data) = match (jar.get(AUTH_TOKEN_COOKIE), jar.get(USER_DATA_COOKIE)) {
            (Some(token), Some(user_data)) => (token, user_data),
            (None, None) => return Ok(None),
            _ => {
                tracing::warn!("Session jar holds only one of the session cookies, ignoring it");
                return Ok(None);
            }
        };

        let user: User = match serde_json::from_str(&user_data.value) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Ignoring session with malformed user record: {}", e);
                return Ok(None);
            }
        };

        Ok(Some(ApplicationSession {
            session_token: token.value.clone(),
            user,
        }))
    }

    fn save(&self, session: &ApplicationSession) -> Result<()> {
        let expires_at = Utc::now() + self.ttl;
        let jar = CookieJar {
            cookies: vec![
                self.cookie(AUTH_TOKEN_COOKIE, session.session_token.clone(), expires_at),
                self.cookie(USER_DATA_COOKIE, serde_json::to_string(&session.user)?, expires_at),
            ],
        };

        write_private_atomic(&self.path, &serde_json::to_vec_pretty(&jar)?)?;
        tracing::debug!(user_id = %session.user.id, %expires_at, "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local session store
#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<ApplicationSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: ApplicationSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<ApplicationSession>> {
        let guard = self
            .session
            .read()
            .map_err(|_| Error::Store("session lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, session: &ApplicationSession) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::Store("session lock poisoned".to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::Store("session lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}
