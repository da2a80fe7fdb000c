//! Revocation list (blacklist) stores.
//!
//! Entries are keyed by the SHA-256 of the signed token so bearer secrets are
//! never kept at rest, and carry the token's own expiry so they can be
//! purged once the token is time-barred anyway.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::AuthError;

/// SHA-256 hash a token into its blacklist key.
pub fn token_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Key → expiry store consulted on every validation.
///
/// Implementations may be process-local or shared between instances.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `key` as revoked until `expires_at`.
    ///
    /// Returns `false` when the key was already present.
    async fn insert(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Whether `key` is present.
    async fn contains(&self, key: &str) -> Result<bool, AuthError>;

    /// Drop entries whose expiry is at or before `now`. Returns how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// In-process store behind a reader/writer lock.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn insert(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), expires_at);
        Ok(true)
    }

    async fn contains(&self, key: &str) -> Result<bool, AuthError> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

/// PostgreSQL-backed store (`token_blacklist` table), shared across instances.
#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn insert(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "INSERT INTO token_blacklist (token_key, expires_at) VALUES ($1, $2) \
             ON CONFLICT (token_key) DO NOTHING",
        )
        .bind(key)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn contains(&self, key: &str) -> Result<bool, AuthError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE token_key = $1)",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
