//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    AssetRecord, DocumentRecord, NewAsset, NewDocument, ProjectOverride, TagRecord, TagRef,
};
use crate::store::Identity;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_tag(&self, id: Identity) -> Result<Option<TagRecord>, RepoError>;

    async fn find_tag_by_value(&self, value: &str) -> Result<Option<TagRecord>, RepoError>;

    /// Create the tag, or set the colour of the existing tag with the same value.
    async fn save_tag(&self, tag: &TagRef) -> Result<TagRecord, RepoError>;

    /// Change the colour of an existing tag. Fails with `NotFound` for an unknown id.
    async fn update_tag_color(&self, id: Identity, color: &str) -> Result<TagRecord, RepoError>;

    /// Remove the tag and every link to it.
    async fn delete_tag(&self, id: Identity) -> Result<(), RepoError>;
}

#[async_trait]
pub trait DocumentsRepo: Send + Sync {
    /// Every document with its tags, in first-seen order.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RepoError>;

    async fn find_document(&self, id: Identity) -> Result<Option<DocumentRecord>, RepoError>;

    /// Insert the document and link its tags atomically. Unknown tag values are
    /// created with the supplied colour.
    async fn create_document(&self, document: &NewDocument) -> Result<DocumentRecord, RepoError>;

    /// Replace the fields and tags of an existing document in one transaction.
    /// Nothing changes when the id is unknown or any step fails.
    async fn update_document(
        &self,
        id: Identity,
        document: &NewDocument,
    ) -> Result<DocumentRecord, RepoError>;

    async fn delete_document(&self, id: Identity) -> Result<(), RepoError>;

    /// Distinct tags attached to at least one document.
    async fn document_tags(&self) -> Result<Vec<TagRef>, RepoError>;

    /// Distinct tags that share a document with the tag `value`, excluding it.
    async fn shared_document_tags(&self, value: &str) -> Result<Vec<TagRef>, RepoError>;
}

#[async_trait]
pub trait ProjectsRepo: Send + Sync {
    async fn list_overrides(&self) -> Result<Vec<ProjectOverride>, RepoError>;

    async fn find_override(&self, id: Identity) -> Result<Option<ProjectOverride>, RepoError>;

    /// Insert or replace the override row and its tags in one transaction.
    async fn save_override(&self, entry: &ProjectOverride) -> Result<ProjectOverride, RepoError>;

    async fn project_tags(&self) -> Result<Vec<TagRef>, RepoError>;

    async fn shared_project_tags(&self, value: &str) -> Result<Vec<TagRef>, RepoError>;
}

#[async_trait]
pub trait AssetsRepo: Send + Sync {
    /// Asset metadata only; `content` is left empty.
    async fn list_assets(&self) -> Result<Vec<AssetRecord>, RepoError>;

    async fn find_asset(&self, id: Identity) -> Result<Option<AssetRecord>, RepoError>;

    async fn find_asset_by_name(&self, name: &str) -> Result<Option<AssetRecord>, RepoError>;

    /// Store a new asset; a taken name is a `Duplicate` error.
    async fn create_asset(&self, asset: &NewAsset) -> Result<AssetRecord, RepoError>;

    /// Remove the asset and return its metadata.
    async fn delete_asset(&self, id: Identity) -> Result<AssetRecord, RepoError>;
}
