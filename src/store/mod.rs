//! Composable read-only views over collections of identity-bearing records.
//!
//! Every entity store implements [`Store`] by loading its backing collection; the
//! [`filter`], [`sort`] and [`group`] operators are written once here and reach every
//! store through [`StoreExt`]. Composition snapshots the parent (`get_all`) and
//! returns a [`MaterializedStore`]; [`LiveStore`] is the opt-in alternative that
//! re-runs its transform against the parent on every read.

mod compose;
mod live;
mod materialized;

use std::error::Error as StdError;

use async_trait::async_trait;
use thiserror::Error;

use crate::util::ordered_map::OrderedMap;

pub use compose::{filter, group, sort};
pub use live::LiveStore;
pub use materialized::MaterializedStore;

/// Stable integer identity of a stored record.
pub type Identity = i64;

/// Boxed underlying failure carried by [`StoreError::Load`].
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Named groups in descending lexical order of their names.
pub type Groups<T> = OrderedMap<String, MaterializedStore<T>>;

/// A record usable inside a [`Store`].
///
/// Ids must be unique within one store.
pub trait Indexable: Clone + Send + Sync + 'static {
    /// Entity name used in not-found reports.
    const ENTITY: &'static str = "record";

    fn id(&self) -> Identity;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Identity },
    #[error("{entity} `{key}` not found")]
    KeyNotFound { entity: &'static str, key: String },
    #[error("failed to load {entity}")]
    Load {
        entity: &'static str,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: Identity) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn load(entity: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Load {
            entity,
            source: source.into(),
        }
    }

    pub fn key_not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::KeyNotFound { .. })
    }
}

/// Capability set shared by materialized and backing stores.
#[async_trait]
pub trait Store<T: Indexable>: Send + Sync {
    /// Every record in the store, in the store's order.
    async fn get_all(&self) -> Result<Vec<T>, StoreError>;

    /// The record with `id`. Defaults to a scan of [`Store::get_all`] so that both
    /// operations always agree.
    async fn get_by_id(&self, id: Identity) -> Result<T, StoreError> {
        self.get_all()
            .await?
            .into_iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| StoreError::not_found(T::ENTITY, id))
    }
}

/// Composition operators available on every [`Store`].
#[async_trait]
pub trait StoreExt<T: Indexable>: Store<T> {
    async fn filter<F>(&self, predicate: F) -> Result<MaterializedStore<T>, StoreError>
    where
        F: Fn(&T) -> bool + Send + Sync,
    {
        compose::filter(self, predicate).await
    }

    async fn sort<F>(&self, less: F) -> Result<MaterializedStore<T>, StoreError>
    where
        F: Fn(&T, &T) -> bool + Send + Sync,
    {
        compose::sort(self, less).await
    }

    async fn group<F>(&self, key: F) -> Result<Groups<T>, StoreError>
    where
        F: Fn(&T) -> String + Send + Sync,
    {
        compose::group(self, key).await
    }
}

impl<T: Indexable, S: Store<T> + ?Sized> StoreExt<T> for S {}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Day {
        pub id: Identity,
        pub name: &'static str,
    }

    impl Indexable for Day {
        const ENTITY: &'static str = "day";

        fn id(&self) -> Identity {
            self.id
        }
    }

    pub fn weekdays() -> Vec<Day> {
        [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| Day { id, name })
        .collect()
    }

    pub fn names(days: &[Day]) -> Vec<&'static str> {
        days.iter().map(|day| day.name).collect()
    }

    /// Backing store that re-reads a shared vector and counts loads.
    #[derive(Clone, Default)]
    pub struct SharedDays {
        pub rows: Arc<Mutex<Vec<Day>>>,
        pub loads: Arc<AtomicUsize>,
    }

    impl SharedDays {
        pub fn with(rows: Vec<Day>) -> Self {
            Self {
                rows: Arc::new(Mutex::new(rows)),
                loads: Arc::default(),
            }
        }

        pub fn push(&self, day: Day) {
            self.rows.lock().expect("rows lock").push(day);
        }
    }

    #[async_trait]
    impl Store<Day> for SharedDays {
        async fn get_all(&self) -> Result<Vec<Day>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().expect("rows lock").clone())
        }
    }

    /// Store whose backing load always fails.
    pub struct BrokenDays;

    #[async_trait]
    impl Store<Day> for BrokenDays {
        async fn get_all(&self) -> Result<Vec<Day>, StoreError> {
            Err(StoreError::load(
                Day::ENTITY,
                std::io::Error::other("connection reset"),
            ))
        }
    }
}
