//! Tier 1: the process-local cache table.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use bytes::Bytes;
use once_cell::sync::Lazy;
use time::{OffsetDateTime, macros::datetime};
use tracing::warn;

use super::keys::CacheKey;

/// Upper limit for `valid_to`; longer lifetimes are clamped to it.
pub const FAR_FUTURE: OffsetDateTime = datetime!(9999-12-31 23:59:59 UTC);

static GLOBAL: Lazy<Arc<LocalCache>> = Lazy::new(|| Arc::new(LocalCache::new()));

type Entries = HashMap<CacheKey, CacheElement>;

/// A cached value and the instant it stops being fresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheElement {
    pub valid_to: OffsetDateTime,
    pub value: Bytes,
}

impl CacheElement {
    pub fn new(value: Bytes, valid_to: OffsetDateTime) -> Self {
        Self { valid_to, value }
    }

    /// Element valid for `max_age` from `now`, but never past [`FAR_FUTURE`].
    pub fn expiring(value: Bytes, max_age: Duration, now: OffsetDateTime) -> Self {
        let valid_to = time::Duration::try_from(max_age)
            .ok()
            .and_then(|age| now.checked_add(age))
            .map_or(FAR_FUTURE, |valid_to| valid_to.min(FAR_FUTURE));
        Self::new(value, valid_to)
    }

    /// Fresh iff `now < valid_to`.
    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        now < self.valid_to
    }
}

/// Lock-guarded map shared by every cached operation in the process.
///
/// Expiry is evaluated on read; stale entries stay in the map until they are
/// overwritten or removed, and the map dies with the process. A panic while
/// the lock is held does not disable the table: the next caller takes the map
/// over as it was left.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: RwLock<Entries>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table that lives for the whole process.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    pub fn get_fresh(&self, key: &CacheKey, now: OffsetDateTime) -> Option<CacheElement> {
        self.read("get_fresh")
            .get(key)
            .filter(|element| element.is_fresh_at(now))
            .cloned()
    }

    pub fn insert(&self, key: CacheKey, element: CacheElement) {
        self.write("insert").insert(key, element);
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheElement> {
        self.write("remove").remove(key)
    }

    pub fn len(&self) -> usize {
        self.read("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!(op, access = "read", "cache table lock was poisoned, reusing its entries");
            poisoned.into_inner()
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(op, access = "write", "cache table lock was poisoned, reusing its entries");
            poisoned.into_inner()
        })
    }
}
