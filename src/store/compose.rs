use std::cmp::Ordering;

use crate::util::ordered_map::OrderedMap;

use super::{Groups, Indexable, MaterializedStore, Store, StoreError};

/// Keep the records for which `predicate` holds, preserving their order.
pub async fn filter<T, S, F>(store: &S, predicate: F) -> Result<MaterializedStore<T>, StoreError>
where
    T: Indexable,
    S: Store<T> + ?Sized,
    F: Fn(&T) -> bool,
{
    let all = store.get_all().await?;
    Ok(all.into_iter().filter(|item| predicate(item)).collect())
}

/// Stable sort with `less` as the strict less-than comparator.
pub async fn sort<T, S, F>(store: &S, less: F) -> Result<MaterializedStore<T>, StoreError>
where
    T: Indexable,
    S: Store<T> + ?Sized,
    F: Fn(&T, &T) -> bool,
{
    let mut all = store.get_all().await?;
    all.sort_by(|a, b| ordering_from_less(&less, a, b));
    Ok(MaterializedStore::new(all))
}

/// Partition records by `key`.
///
/// Members of a group keep their relative order; the groups themselves are listed
/// in descending lexical order of their names, so year keys read newest first.
pub async fn group<T, S, F>(store: &S, key: F) -> Result<Groups<T>, StoreError>
where
    T: Indexable,
    S: Store<T> + ?Sized,
    F: Fn(&T) -> String,
{
    let all = store.get_all().await?;

    let mut buckets: OrderedMap<String, Vec<T>> = OrderedMap::new();
    for item in all {
        let name = key(&item);
        match buckets.get_mut(&name) {
            Some(members) => members.push(item),
            None => buckets.set(name, vec![item]),
        }
    }

    let mut named: Vec<(String, Vec<T>)> = buckets.into_iter().collect();
    named.sort_by(|(left, _), (right, _)| right.cmp(left));

    Ok(named
        .into_iter()
        .map(|(name, members)| (name, MaterializedStore::new(members)))
        .collect())
}

fn ordering_from_less<T, F>(less: &F, a: &T, b: &T) -> Ordering
where
    F: Fn(&T, &T) -> bool,
{
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}
