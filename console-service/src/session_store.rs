//! Session store.
//!
//! Maps opaque session tokens to the credentials entered on connect.
//! Storing credentials never touches the database; they are validated the
//! first time a connection is acquired with them.

use std::collections::HashMap;
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::{Credentials, SessionToken};
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug)]
struct SessionEntry {
    credentials: Credentials,
    last_seen: Instant,
}

/// In-memory credential store keyed by session token.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionToken, SessionEntry>>,
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    /// `idle_timeout` of `None` keeps sessions until they disconnect.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Stores `credentials`, replacing whatever `existing` held.
    ///
    /// `existing` is kept only when it names a live session; any other
    /// token is ignored and a fresh one is issued. Idle sessions are
    /// swept while the write lock is held.
    pub async fn connect(
        &self,
        existing: Option<&SessionToken>,
        credentials: Credentials,
    ) -> SessionToken {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::info!(swept, "idle sessions expired");
        }

        let (token, replaced) = match existing {
            Some(token) if sessions.contains_key(token) => (token.clone(), true),
            _ => (SessionToken::generate(), false),
        };
        sessions.insert(
            token.clone(),
            SessionEntry {
                credentials,
                last_seen: Instant::now(),
            },
        );
        tracing::info!(replaced, "session credentials stored");
        token
    }

    /// Forgets the session. Unknown or missing tokens are a no-op.
    pub async fn disconnect(&self, token: Option<&SessionToken>) {
        let Some(token) = token else {
            return;
        };
        if self.sessions.write().await.remove(token).is_some() {
            tracing::info!("session disconnected");
        }
    }

    pub async fn is_connected(&self, token: Option<&SessionToken>) -> bool {
        self.get(token).await.is_ok()
    }

    /// Credentials for the session, refreshing its idle clock.
    pub async fn get(&self, token: Option<&SessionToken>) -> AppResult<Credentials> {
        let token = token.ok_or(AppError::NotConnected)?;
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(token) {
            None => return Err(AppError::NotConnected),
            Some(entry) => self.is_expired(entry),
        };
        if expired {
            sessions.remove(token);
            tracing::info!("idle session expired");
            return Err(AppError::NotConnected);
        }

        match sessions.get_mut(token) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                Ok(entry.credentials.clone())
            }
            None => Err(AppError::NotConnected),
        }
    }

    /// Number of live sessions, dropping expired ones first.
    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| !self.is_expired(entry));
        sessions.len()
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        self.idle_timeout
            .is_some_and(|limit| entry.last_seen.elapsed() > limit)
    }
}
