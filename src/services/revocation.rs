//! Token revocation registry
//!
//! A key-value store of revoked token ids (jti) with automatic expiry,
//! consulted by the authentication gate on every request. Entries are
//! write-once-then-expire: the TTL equals the maximum token lifetime plus
//! a margin, so an entry always outlives the token it blocks and storage
//! growth stays bounded.

use moka::future::Cache;
use std::time::Duration;

/// Registry of revoked token ids.
///
/// Backed by a moka future cache, which is safe for concurrent callers;
/// there are no read-modify-write races because existing entries are never
/// mutated.
pub struct RevocationRegistry {
    revoked: Cache<String, ()>,
}

impl RevocationRegistry {
    /// Create a registry whose entries live for `ttl`.
    ///
    /// `ttl` should be the maximum token lifetime plus a safety margin
    /// (see `TokenService::max_token_lifetime`).
    pub fn new(ttl: Duration) -> Self {
        let revoked = Cache::builder()
            .time_to_live(ttl)
            .build();
        Self { revoked }
    }

    /// Mark a jti as revoked. Idempotent.
    pub async fn revoke(&self, jti: &str) {
        self.revoked.insert(jti.to_string(), ()).await;
    }

    /// Whether a jti has been revoked (and its entry has not yet expired).
    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.get(jti).await.is_some()
    }
}
