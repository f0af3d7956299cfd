use std::sync::Arc;

use async_trait::async_trait;

use super::{Identity, Indexable, Store, StoreError, compose};

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type Less<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

enum Transform<T> {
    Filter(Predicate<T>),
    Sort(Less<T>),
}

impl<T> Clone for Transform<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Filter(predicate) => Self::Filter(Arc::clone(predicate)),
            Self::Sort(less) => Self::Sort(Arc::clone(less)),
        }
    }
}

/// Derived view that re-reads its parent on every call.
///
/// Unlike the snapshots returned by [`StoreExt`](super::StoreExt), a live view
/// observes rows added to the backing collection after the view was built.
pub struct LiveStore<T: Indexable> {
    parent: Arc<dyn Store<T>>,
    transform: Transform<T>,
}

impl<T: Indexable> Clone for LiveStore<T> {
    fn clone(&self) -> Self {
        Self {
            parent: Arc::clone(&self.parent),
            transform: self.transform.clone(),
        }
    }
}

impl<T: Indexable> LiveStore<T> {
    pub fn filtered<F>(parent: Arc<dyn Store<T>>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            parent,
            transform: Transform::Filter(Arc::new(predicate)),
        }
    }

    pub fn sorted<F>(parent: Arc<dyn Store<T>>, less: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            parent,
            transform: Transform::Sort(Arc::new(less)),
        }
    }
}

#[async_trait]
impl<T: Indexable> Store<T> for LiveStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        let parent = self.parent.as_ref();
        let view = match &self.transform {
            Transform::Filter(predicate) => compose::filter(parent, |item| predicate(item)).await?,
            Transform::Sort(less) => compose::sort(parent, |a, b| less(a, b)).await?,
        };
        Ok(view.into_vec())
    }

    async fn get_by_id(&self, id: Identity) -> Result<T, StoreError> {
        let item = self.parent.get_by_id(id).await?;
        match &self.transform {
            Transform::Filter(predicate) if !predicate(&item) => {
                Err(StoreError::not_found(T::ENTITY, id))
            }
            _ => Ok(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::store::StoreExt;
    use crate::store::testing::{Day, SharedDays, names, weekdays};

    #[tokio::test]
    async fn live_filter_sees_rows_added_after_creation() {
        let backing = SharedDays::with(weekdays());
        let live = LiveStore::filtered(Arc::new(backing.clone()), |day: &Day| {
            day.name.starts_with('S')
        });

        assert_eq!(live.get_all().await.expect("get_all").len(), 2);

        backing.push(Day {
            id: 8,
            name: "Someday",
        });

        let after = live.get_all().await.expect("get_all");
        assert_eq!(names(&after), vec!["Saturday", "Sunday", "Someday"]);
        assert_eq!(backing.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn live_filter_hides_excluded_ids() {
        let backing = SharedDays::with(weekdays());
        let live = LiveStore::filtered(Arc::new(backing), |day: &Day| day.name.starts_with('S'));

        assert!(live.get_by_id(6).await.is_ok());
        assert!(live.get_by_id(1).await.expect_err("monday").is_not_found());
    }

    #[tokio::test]
    async fn live_sort_then_snapshot_group() {
        let backing = SharedDays::with(weekdays());
        let live: Arc<dyn Store<Day>> =
            Arc::new(LiveStore::sorted(Arc::new(backing), |a: &Day, b: &Day| {
                a.name < b.name
            }));

        let groups = live
            .group(|day| day.name[..1].to_string())
            .await
            .expect("group");
        let t_days = groups.get(&"T".to_string()).expect("T group");
        assert_eq!(names(t_days.as_slice()), vec!["Thursday", "Tuesday"]);
    }
}
