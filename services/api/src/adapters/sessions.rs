//! services/api/src/adapters/sessions.rs
//!
//! Server-side login sessions. The browser only holds an opaque id in the
//! `session` cookie; the id maps to a username here until it expires or the
//! user logs out. Sessions live in memory and do not survive a restart.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Represents one browser login session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, AuthSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session for `username` and returns its id.
    pub async fn create(&self, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let session = AuthSession {
            username: username.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > Utc::now());
        sessions.insert(id.clone(), session);
        id
    }

    /// Returns the username for a live session id.
    pub async fn validate(&self, id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.username.clone())
    }

    /// Ends a session. Unknown ids are ignored.
    pub async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }
}
