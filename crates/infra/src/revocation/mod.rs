//! Revocation store backends.
//!
//! The contract lives in `keystone-auth`; this module provides the shared
//! key layout and the infrastructure-backed implementation (Redis).

use std::time::Duration;

use keystone_auth::{CredentialRealm, TokenId};

#[cfg(feature = "redis")]
pub mod redis_store;

#[cfg(feature = "redis")]
pub use redis_store::RedisRevocationStore;

/// Key prefix shared by every service of a deployment.
pub const KEY_PREFIX: &str = "keystone:revoked";

/// Storage key for a revoked credential, namespaced by realm.
pub fn revocation_key(realm: CredentialRealm, token_id: TokenId) -> String {
    format!("{KEY_PREFIX}:{}:{token_id}", realm.revocation_namespace())
}

/// Whole seconds for an expiring key, rounded up so the entry never
/// disappears before the credential does.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs + 1 } else { secs }
}
