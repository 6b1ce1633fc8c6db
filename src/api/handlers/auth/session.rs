//! Server-side sessions keyed by an opaque id carried in an `HttpOnly` cookie.

use anyhow::Result;
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    principal::{ADMIN_ID, ADMIN_NAME, Principal},
    token::unix_now,
    utils::generate_session_id,
};

pub const SESSION_COOKIE_NAME: &str = "account_session";

/// What kind of principal a session belongs to.
///
/// A session is never both admin and service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionRole {
    Admin { id: i64 },
    Service { id: i64 },
    User,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: SessionRole,
}

impl Session {
    #[must_use]
    pub fn for_principal(principal: &Principal) -> Self {
        match principal {
            Principal::Admin => Self {
                username: ADMIN_NAME.to_string(),
                role: SessionRole::Admin { id: ADMIN_ID },
            },
            Principal::Service { id, name } => Self {
                username: name.clone(),
                role: SessionRole::Service { id: *id },
            },
            Principal::User { name } => Self {
                username: name.clone(),
                role: SessionRole::User,
            },
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, SessionRole::Admin { .. })
    }
}

#[derive(Debug)]
struct Entry {
    session: Session,
    expires_at: i64,
}

/// Process-local session records. Not persisted across restarts.
///
/// A session lives as long as the token issued with it. Expired records are
/// dropped whenever the store is read or written, and a new session for a
/// principal replaces its older ones.
#[derive(Debug)]
pub struct SessionStore {
    ttl_seconds: i64,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Store a session under a fresh id and return the id.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub async fn create(&self, session: Session) -> Result<String> {
        self.create_at(session, unix_now()).await
    }

    /// [`SessionStore::create`] against an explicit clock.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub async fn create_at(&self, session: Session, now: i64) -> Result<String> {
        let id = generate_session_id()?;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| {
            entry.expires_at > now && entry.session.username != session.username
        });
        sessions.insert(
            id.clone(),
            Entry {
                session,
                expires_at: now.saturating_add(self.ttl_seconds),
            },
        );
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.get_at(id, unix_now()).await
    }

    /// [`SessionStore::get`] against an explicit clock. An expired session is
    /// removed and reported as absent.
    pub async fn get_at(&self, id: &str, now: i64) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                None => return None,
                Some(entry) if entry.expires_at > now => return Some(entry.session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        None
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|entry| entry.session)
    }

    /// Drop every session of `username`; returns how many were removed.
    pub async fn remove_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.session.username != username);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Build the session cookie. It lives as long as the bearer token.
pub(super) fn session_cookie(
    session_id: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    ))
}

pub(super) fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("account_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Session id from the `Cookie` header(s), if any.
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
