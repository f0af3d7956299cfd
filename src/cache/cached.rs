//! Memoizing wrapper around an expensive "produce bytes or fail" operation.

use std::future::Future;

use bytes::Bytes;
use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::config::CacheOptions;
use super::external::CacheError;
use super::keys::CacheKey;
use super::store::CacheElement;

/// An operation whose successful results are cached in tier 1 and, when
/// configured, in the persisted tier 2.
///
/// Wrappers are cheap; build one wherever the operation is needed. Two wrappers
/// with the same identity and parameter share entries, even across processes.
pub struct Cached<F> {
    identity: String,
    key: CacheKey,
    options: CacheOptions,
    op: F,
}

impl<F, Fut, E> Cached<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes, E>> + Send,
{
    pub fn new(identity: impl Into<String>, op: F, options: CacheOptions) -> Self {
        let identity = identity.into();
        let key = CacheKey::derive(&identity, None);
        Self {
            identity,
            key,
            options,
            op,
        }
    }

    /// Like [`Cached::new`], but entries are additionally keyed by `param`.
    pub fn with_param(
        identity: impl Into<String>,
        param: impl AsRef<str>,
        op: F,
        options: CacheOptions,
    ) -> Self {
        let identity = identity.into();
        let key = CacheKey::derive(&identity, Some(param.as_ref()));
        Self {
            identity,
            key,
            options,
            op,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Forget the tier 1 entry so the next call consults tier 2 or the operation.
    pub fn invalidate(&self) {
        self.options.local.remove(&self.key);
    }

    /// Cached value if fresh, otherwise the operation's result. Failures are
    /// returned as-is and never cached.
    pub async fn call(&self) -> Result<Bytes, E> {
        let now = OffsetDateTime::now_utc();

        if let Some(element) = self.options.local.get_fresh(&self.key, now) {
            counter!("vitrine_cache_tier1_hit_total").increment(1);
            debug!(
                identity = %self.identity,
                key = %self.key,
                valid_to = %element.valid_to,
                "cache hit (tier 1)"
            );
            return Ok(element.value);
        }

        if let Some(element) = self.lookup_external(now).await {
            counter!("vitrine_cache_tier2_hit_total").increment(1);
            debug!(
                identity = %self.identity,
                key = %self.key,
                valid_to = %element.valid_to,
                "cache hit (tier 2)"
            );
            self.options.local.insert(self.key.clone(), element.clone());
            return Ok(element.value);
        }

        counter!("vitrine_cache_miss_total").increment(1);
        debug!(identity = %self.identity, key = %self.key, "cache miss, running operation");

        let value = (self.op)().await?;
        let element = CacheElement::expiring(
            value.clone(),
            self.options.max_age,
            OffsetDateTime::now_utc(),
        );
        self.store_external(&element).await;
        self.options.local.insert(self.key.clone(), element);

        Ok(value)
    }

    async fn lookup_external(&self, now: OffsetDateTime) -> Option<CacheElement> {
        let lookup = match self.options.external() {
            Ok(external) => external.get(&self.key).await,
            Err(err) => Err(err),
        };

        match lookup {
            Ok(Some(element)) if element.is_fresh_at(now) => Some(element),
            Ok(_) | Err(CacheError::Unavailable) => None,
            Err(err) => {
                counter!("vitrine_cache_external_error_total").increment(1);
                warn!(
                    identity = %self.identity,
                    key = %self.key,
                    error = %err,
                    "external cache read failed, recomputing"
                );
                None
            }
        }
    }

    async fn store_external(&self, element: &CacheElement) {
        let external = match self.options.external() {
            Ok(external) => external,
            Err(_) => return,
        };

        if let Err(err) = external.put(&self.key, element).await {
            counter!("vitrine_cache_external_error_total").increment(1);
            warn!(
                identity = %self.identity,
                key = %self.key,
                error = %err,
                "external cache write failed"
            );
        }
    }
}
