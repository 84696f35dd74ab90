//! Revocation contract: explicit invalidation of credentials before expiry.
//!
//! A revocation entry only needs to live as long as the credential it
//! shadows, so every entry carries a TTL equal to the credential's remaining
//! lifetime and expires on its own. Backends must make a successful
//! [`RevocationStore::revoke`] visible to every later
//! [`RevocationStore::is_revoked`] against the same store, across processes.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::TokenId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevocationError {
    /// The backend could not be reached or answered with an error.
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the configured bound.
    #[error("revocation store timed out")]
    Timeout,
}

/// Result of a revoke request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// An entry was written for the remaining lifetime.
    Revoked,
    /// The credential had already expired; nothing was written.
    AlreadyExpired,
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token_id` as revoked for `ttl`. A zero `ttl` is a no-op.
    async fn revoke(&self, token_id: TokenId, ttl: Duration) -> Result<(), RevocationError>;

    /// Whether `token_id` has an unexpired revocation entry.
    ///
    /// Errors must never be interpreted as "not revoked" by callers.
    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RevocationError>;
}

/// Remaining lifetime of a credential at `now`, or `None` once it has expired.
pub fn remaining_lifetime(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    (expires_at - now)
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
}

/// In-memory revocation store for tests/dev.
///
/// Only shared within one process; production deployments use the Redis
/// backend so that every instance observes the same entries.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<TokenId, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        match self.entries.write() {
            Ok(mut map) => {
                let before = map.len();
                map.retain(|_, expires| *expires > now);
                before - map.len()
            }
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token_id: TokenId, ttl: Duration) -> Result<(), RevocationError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let mut map = self
            .entries
            .write()
            .map_err(|_| RevocationError::Unavailable("lock poisoned".to_string()))?;
        // Expire lazily on every write so the map stays bounded.
        map.retain(|_, expires| *expires > now);
        map.insert(token_id, now + ttl);
        Ok(())
    }

    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RevocationError> {
        let map = self
            .entries
            .read()
            .map_err(|_| RevocationError::Unavailable("lock poisoned".to_string()))?;
        Ok(map
            .get(&token_id)
            .is_some_and(|expires| *expires > Instant::now()))
    }
}
