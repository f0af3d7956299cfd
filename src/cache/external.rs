//! Tier 2: the persisted, cross-process cache table.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use super::keys::CacheKey;
use super::store::CacheElement;

#[derive(Debug, Error)]
pub enum CacheError {
    /// No persisted tier is configured. Only used to fall through to the operation.
    #[error("no external cache configured")]
    Unavailable,
    #[error("external cache backend failed: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Persisted key/value/expiry table shared by every process of the site.
#[async_trait]
pub trait ExternalCache: Send + Sync {
    /// The stored element, fresh or not. Freshness is judged by the caller.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheElement>, CacheError>;

    /// Insert or replace the element stored under `key`.
    async fn put(&self, key: &CacheKey, element: &CacheElement) -> Result<(), CacheError>;

    /// Delete rows that expired at or before `now`, returning how many were removed.
    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, CacheError>;
}
