//! Session secret storage.
//!
//! The store owns every piece of shared login state. Each primitive is a single
//! critical section, which is what makes `PENDING -> VERIFIED` exclusive when
//! several callbacks for the same session race each other.

use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use ulid::Ulid;
use utoipa::ToSchema;

/// Size of the `k1` challenge in bytes.
pub const SECRET_LEN: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Verified,
    Expired,
    Consumed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("session not found")]
    NotFound,
    #[error("session is {0:?}")]
    InvalidState(SessionStatus),
    #[error("{0}")]
    Unavailable(String),
}

/// Freshly issued session.
#[derive(Debug)]
pub struct Challenge {
    pub session_id: String,
    pub secret: SecretBox<[u8; SECRET_LEN]>,
}

/// Snapshot of a session as seen by a single `lookup`.
#[derive(Debug)]
pub struct SessionRecord {
    pub status: SessionStatus,
    pub secret: SecretBox<[u8; SECRET_LEN]>,
    pub linking_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Verified,
    /// Another request won the race; carries the key it linked.
    AlreadyVerified(Vec<u8>),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create a `PENDING` session bound to a new random secret.
    async fn issue(&self) -> Result<Challenge, StoreError>;

    async fn lookup(&self, session_id: &str) -> Result<SessionRecord, StoreError>;

    /// Atomically move a `PENDING` session to `VERIFIED` and link `linking_key`.
    async fn transition_to_verified(
        &self,
        session_id: &str,
        linking_key: &[u8],
    ) -> Result<Transition, StoreError>;

    /// Count a failed signature attempt; returns the resulting status.
    async fn record_failure(&self, session_id: &str) -> Result<SessionStatus, StoreError>;

    /// Move a `VERIFIED` session to `CONSUMED` and return its linking key.
    async fn consume(&self, session_id: &str) -> Result<Vec<u8>, StoreError>;
}

struct Entry {
    secret: SecretBox<[u8; SECRET_LEN]>,
    status: SessionStatus,
    linking_key: Option<Vec<u8>>,
    failed_attempts: u32,
    created_at: Instant,
}

impl Entry {
    /// Pending sessions older than the TTL are expired lazily.
    fn refresh(&mut self, ttl: Duration) -> SessionStatus {
        if self.status == SessionStatus::Pending && self.created_at.elapsed() >= ttl {
            self.status = SessionStatus::Expired;
        }
        self.status
    }
}

/// In-process store for single-instance deployments and tests.
///
/// Entries older than the TTL are dropped whenever a session is issued,
/// looked up or consumed. The entry being addressed is kept so it can still
/// report `EXPIRED` or `CONSUMED`.
pub struct MemoryStore {
    ttl: Duration,
    max_failed_attempts: u32,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(ttl: Duration, max_failed_attempts: u32) -> Self {
        Self {
            ttl,
            max_failed_attempts,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn prune(&self, sessions: &mut HashMap<String, Entry>, keep: &str) {
        sessions.retain(|id, entry| id == keep || entry.created_at.elapsed() < self.ttl);
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("ttl", &self.ttl)
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("sessions", &"***")
            .finish()
    }
}

fn generate_secret() -> Result<[u8; SECRET_LEN], StoreError> {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| StoreError::Unavailable(format!("failed to generate secret: {e}")))?;
    Ok(bytes)
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn issue(&self) -> Result<Challenge, StoreError> {
        let secret = generate_secret()?;
        let session_id = Ulid::new().to_string();

        let mut sessions = self.sessions.lock().await;
        self.prune(&mut sessions, &session_id);
        sessions.insert(
            session_id.clone(),
            Entry {
                secret: SecretBox::new(Box::new(secret)),
                status: SessionStatus::Pending,
                linking_key: None,
                failed_attempts: 0,
                created_at: Instant::now(),
            },
        );

        Ok(Challenge {
            session_id,
            secret: SecretBox::new(Box::new(secret)),
        })
    }

    async fn lookup(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        let mut sessions = self.sessions.lock().await;
        self.prune(&mut sessions, session_id);
        let entry = sessions.get_mut(session_id).ok_or(StoreError::NotFound)?;
        let status = entry.refresh(self.ttl);

        Ok(SessionRecord {
            status,
            secret: SecretBox::new(Box::new(*entry.secret.expose_secret())),
            linking_key: entry.linking_key.clone(),
        })
    }

    async fn transition_to_verified(
        &self,
        session_id: &str,
        linking_key: &[u8],
    ) -> Result<Transition, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(session_id).ok_or(StoreError::NotFound)?;

        match entry.refresh(self.ttl) {
            SessionStatus::Pending => {
                entry.status = SessionStatus::Verified;
                entry.linking_key = Some(linking_key.to_vec());
                Ok(Transition::Verified)
            }
            SessionStatus::Verified => Ok(Transition::AlreadyVerified(
                entry.linking_key.clone().unwrap_or_default(),
            )),
            status => Err(StoreError::InvalidState(status)),
        }
    }

    async fn record_failure(&self, session_id: &str) -> Result<SessionStatus, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(session_id).ok_or(StoreError::NotFound)?;

        if entry.refresh(self.ttl) == SessionStatus::Pending {
            entry.failed_attempts = entry.failed_attempts.saturating_add(1);
            if self.max_failed_attempts > 0 && entry.failed_attempts >= self.max_failed_attempts {
                entry.status = SessionStatus::Expired;
            }
        }
        Ok(entry.status)
    }

    async fn consume(&self, session_id: &str) -> Result<Vec<u8>, StoreError> {
        let mut sessions = self.sessions.lock().await;
        self.prune(&mut sessions, session_id);
        let entry = sessions.get_mut(session_id).ok_or(StoreError::NotFound)?;

        match entry.refresh(self.ttl) {
            SessionStatus::Verified => {
                entry.status = SessionStatus::Consumed;
                Ok(entry.linking_key.clone().unwrap_or_default())
            }
            status => Err(StoreError::InvalidState(status)),
        }
    }
}
