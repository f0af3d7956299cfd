use async_trait::async_trait;

use super::{Identity, Indexable, Store, StoreError};

/// Store backed by an already-loaded vector of records.
///
/// The default value is an empty store, which is what callers fall back to when a
/// composition fails and they still want something to render.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedStore<T> {
    items: Vec<T>,
}

impl<T> Default for MaterializedStore<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> MaterializedStore<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for MaterializedStore<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for MaterializedStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a MaterializedStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[async_trait]
impl<T: Indexable> Store<T> for MaterializedStore<T> {
    async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.items.clone())
    }

    async fn get_by_id(&self, id: Identity) -> Result<T, StoreError> {
        self.items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(T::ENTITY, id))
    }
}
