use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    application::{error::AppError, repos::DocumentsRepo},
    domain::entities::{DocumentRecord, NewDocument, TagRef},
    store::{Identity, Indexable, LiveStore, Store, StoreError},
};

/// Live store over every document.
///
/// Views built through [`StoreExt`](crate::store::StoreExt) are snapshots; use
/// [`DocumentStore::live_filter`] for a listing that must show rows created after
/// the view was built.
#[derive(Clone)]
pub struct DocumentStore {
    repo: Arc<dyn DocumentsRepo>,
}

impl DocumentStore {
    pub fn new(repo: Arc<dyn DocumentsRepo>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, document: NewDocument) -> Result<DocumentRecord, AppError> {
        document.validate()?;
        let record = self.repo.create_document(&document).await?;
        info!(
            target = "vitrine::application::documents",
            document_id = record.id,
            tags = record.tags.len(),
            "document created"
        );
        Ok(record)
    }

    /// Replace title, content, date and tags of an existing document.
    pub async fn update(
        &self,
        id: Identity,
        document: NewDocument,
    ) -> Result<DocumentRecord, AppError> {
        document.validate()?;
        let record = self.repo.update_document(id, &document).await?;
        info!(
            target = "vitrine::application::documents",
            document_id = record.id,
            tags = record.tags.len(),
            "document updated"
        );
        Ok(record)
    }

    pub async fn delete(&self, id: Identity) -> Result<(), AppError> {
        self.repo.delete_document(id).await?;
        info!(
            target = "vitrine::application::documents",
            document_id = id,
            "document deleted"
        );
        Ok(())
    }

    pub fn live_filter<F>(&self, predicate: F) -> LiveStore<DocumentRecord>
    where
        F: Fn(&DocumentRecord) -> bool + Send + Sync + 'static,
    {
        LiveStore::filtered(Arc::new(self.clone()), predicate)
    }

    pub async fn all_tags(&self) -> Result<Vec<TagRef>, StoreError> {
        self.repo
            .document_tags()
            .await
            .map_err(|err| StoreError::load(DocumentRecord::ENTITY, err))
    }

    pub async fn shared_tags(&self, value: &str) -> Result<Vec<TagRef>, StoreError> {
        self.repo
            .shared_document_tags(value)
            .await
            .map_err(|err| StoreError::load(DocumentRecord::ENTITY, err))
    }
}

#[async_trait]
impl Store<DocumentRecord> for DocumentStore {
    async fn get_all(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        self.repo
            .list_documents()
            .await
            .map_err(|err| StoreError::load(DocumentRecord::ENTITY, err))
    }

    async fn get_by_id(&self, id: Identity) -> Result<DocumentRecord, StoreError> {
        self.repo
            .find_document(id)
            .await
            .map_err(|err| StoreError::load(DocumentRecord::ENTITY, err))?
            .ok_or_else(|| StoreError::not_found(DocumentRecord::ENTITY, id))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::testing::{MemoryRepos, tag};
    use crate::domain::{entities::Tagged, error::DomainError};
    use crate::store::StoreExt;

    fn titles(documents: &[DocumentRecord]) -> Vec<&str> {
        documents.iter().map(|doc| doc.title.as_str()).collect()
    }

    #[tokio::test]
    async fn snapshot_view_ignores_later_rows_but_live_view_sees_them() {
        let repos = MemoryRepos::seeded();
        let store = DocumentStore::new(Arc::new(repos.clone()));

        let snapshot = store.filter(|doc| doc.has_tag("notes")).await.expect("filter");
        let live = store.live_filter(|doc| doc.has_tag("notes"));

        store
            .create(NewDocument {
                title: "Reading list".to_string(),
                content: String::new(),
                tags: vec![tag("notes")],
                created_at: datetime!(2024-02-01 10:00 UTC),
            })
            .await
            .expect("create");

        assert_eq!(snapshot.len(), 2);
        let live_rows = live.get_all().await.expect("live");
        assert_eq!(
            titles(&live_rows),
            vec!["Ownership notes", "Year in review", "Reading list"]
        );
    }

    #[tokio::test]
    async fn filtered_view_hides_excluded_ids() {
        let store = DocumentStore::new(Arc::new(MemoryRepos::seeded()));
        let go = store.filter(|doc| doc.has_tag("go")).await.expect("filter");

        assert!(go.get_by_id(2).await.is_ok());
        let err = go.get_by_id(1).await.expect_err("excluded");
        assert!(err.is_not_found());
        assert!(store.get_by_id(1).await.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_invalid_documents() {
        let store = DocumentStore::new(Arc::new(MemoryRepos::seeded()));
        let err = store
            .create(NewDocument {
                title: String::new(),
                content: "body".to_string(),
                tags: Vec::new(),
                created_at: datetime!(2024-02-01 10:00 UTC),
            })
            .await
            .expect_err("empty title");
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidField {
                field: "document.title",
                ..
            })
        ));
        assert_eq!(store.get_all().await.expect("documents").len(), 4);
    }

    fn revision(title: &str, tags: &[&str]) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            content: "revised".to_string(),
            tags: tags.iter().map(|value| tag(value)).collect(),
            created_at: datetime!(2022-03-01 09:00 UTC),
        }
    }

    #[tokio::test]
    async fn update_replaces_fields_and_tags() {
        let store = DocumentStore::new(Arc::new(MemoryRepos::seeded()));

        let updated = store
            .update(1, revision("Borrowing notes", &["rust", "rust", "systems"]))
            .await
            .expect("update");
        assert_eq!(updated.id, 1);

        let stored = store.get_by_id(1).await.expect("by id");
        assert_eq!(stored, updated);
        assert_eq!(stored.title, "Borrowing notes");
        let values: Vec<&str> = stored.tags.iter().map(|tag| tag.value.as_str()).collect();
        assert_eq!(values, vec!["rust", "systems"]);
        assert!(!stored.has_tag("notes"));
    }

    #[tokio::test]
    async fn failed_updates_leave_documents_unchanged() {
        let store = DocumentStore::new(Arc::new(MemoryRepos::seeded()));
        let before = store.get_all().await.expect("documents");

        let err = store
            .update(99, revision("Ghost", &["brand-new"]))
            .await
            .expect_err("unknown id");
        assert!(err.is_not_found());

        let err = store
            .update(2, revision(" ", &["go"]))
            .await
            .expect_err("blank title");
        assert_eq!(err.exit_code(), 2);

        assert_eq!(store.get_all().await.expect("documents"), before);
        assert!(!store.all_tags().await.expect("tags").contains(&tag("brand-new")));
    }

    #[tokio::test]
    async fn delete_removes_one_document() {
        let store = DocumentStore::new(Arc::new(MemoryRepos::seeded()));

        store.delete(3).await.expect("delete");
        assert!(store.get_by_id(3).await.expect_err("gone").is_not_found());
        assert_eq!(store.get_all().await.expect("documents").len(), 3);

        let err = store.delete(3).await.expect_err("already gone");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn tag_queries() {
        let store = DocumentStore::new(Arc::new(MemoryRepos::seeded()));

        let all: Vec<String> = store
            .all_tags()
            .await
            .expect("tags")
            .into_iter()
            .map(|tag| tag.value)
            .collect();
        assert_eq!(all, vec!["rust", "notes", "go", "web"]);

        let shared: Vec<String> = store
            .shared_tags("go")
            .await
            .expect("shared")
            .into_iter()
            .map(|tag| tag.value)
            .collect();
        assert_eq!(shared, vec!["web"]);
    }
}
