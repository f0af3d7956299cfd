//! Per-operation cache options.

use std::{fmt, sync::Arc, time::Duration};

use super::external::{CacheError, ExternalCache};
use super::keys::CacheKey;
use super::store::LocalCache;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// How long a cached value lives and which tiers back it.
///
/// Without an external store only tier 1 is consulted.
#[derive(Clone)]
pub struct CacheOptions {
    pub max_age: Duration,
    pub external: Option<Arc<dyn ExternalCache>>,
    pub local: Arc<LocalCache>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            external: None,
            local: LocalCache::global(),
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("max_age", &self.max_age)
            .field("external", &self.external.is_some())
            .field("local_entries", &self.local.len())
            .finish()
    }
}

impl CacheOptions {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_external(mut self, external: Arc<dyn ExternalCache>) -> Self {
        self.external = Some(external);
        self
    }

    /// Same options with the persisted tier switched off.
    pub fn local_only(mut self) -> Self {
        self.external = None;
        self
    }

    pub fn with_local(mut self, local: Arc<LocalCache>) -> Self {
        self.local = local;
        self
    }

    /// Drop the tier 1 entry stored under `identity` and `param`, so writers can
    /// evict values memoized by wrappers they do not hold.
    pub fn forget(&self, identity: &str, param: Option<&str>) {
        self.local.remove(&CacheKey::derive(identity, param));
    }

    pub(crate) fn external(&self) -> Result<&dyn ExternalCache, CacheError> {
        self.external.as_deref().ok_or(CacheError::Unavailable)
    }
}
