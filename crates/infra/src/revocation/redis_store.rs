//! Redis-backed revocation store.
//!
//! Entries are written with `SET key 1 EX ttl` and checked with `EXISTS`, so
//! Redis expires them on its own and every process pointed at the same
//! instance sees a revoke as soon as the `SET` returns.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::instrument;

use keystone_auth::{CredentialRealm, RevocationError, RevocationStore, TokenId};

use super::{revocation_key, ttl_seconds};

#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
    realm: CredentialRealm,
}

fn unavailable(e: redis::RedisError) -> RevocationError {
    RevocationError::Unavailable(e.to_string())
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, realm: CredentialRealm) -> Self {
        Self { conn, realm }
    }

    /// Open a managed (auto-reconnecting) connection.
    pub async fn connect(
        redis_url: &str,
        realm: CredentialRealm,
    ) -> Result<Self, RevocationError> {
        let client = redis::Client::open(redis_url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(Self::new(conn, realm))
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    #[instrument(skip(self), fields(realm = %self.realm))]
    async fn revoke(&self, token_id: TokenId, ttl: Duration) -> Result<(), RevocationError> {
        let secs = ttl_seconds(ttl);
        if secs == 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(revocation_key(self.realm, token_id), "1", secs)
            .await
            .map_err(unavailable)
    }

    #[instrument(skip(self), fields(realm = %self.realm))]
    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RevocationError> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(revocation_key(self.realm, token_id))
            .await
            .map_err(unavailable)
    }
}
