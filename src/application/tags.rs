use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    application::{error::AppError, repos::TagsRepo},
    domain::{
        entities::{TagRecord, TagRef},
        error::require_text,
    },
    store::{Identity, Indexable, Store, StoreError},
};

/// Live store over every tag; each read goes back to the repository.
#[derive(Clone)]
pub struct TagStore {
    repo: Arc<dyn TagsRepo>,
}

impl TagStore {
    pub fn new(repo: Arc<dyn TagsRepo>) -> Self {
        Self { repo }
    }

    pub async fn get_by_value(&self, value: &str) -> Result<TagRecord, StoreError> {
        self.repo
            .find_tag_by_value(value)
            .await
            .map_err(|err| StoreError::load(TagRecord::ENTITY, err))?
            .ok_or_else(|| StoreError::key_not_found(TagRecord::ENTITY, value))
    }

    /// Create the tag, or recolour the existing tag with the same value.
    pub async fn add(&self, tag: TagRef) -> Result<TagRecord, AppError> {
        tag.validate()?;
        let record = self.repo.save_tag(&tag).await?;
        info!(
            target = "vitrine::application::tags",
            tag_id = record.id,
            value = %record.value,
            color = %record.color,
            "tag saved"
        );
        Ok(record)
    }

    /// Recolour a tag. Values are fixed once created, so a different value is rejected.
    pub async fn update(&self, id: Identity, tag: TagRef) -> Result<TagRecord, AppError> {
        tag.validate()?;
        let current = self.get_by_id(id).await?;
        if current.value != tag.value {
            return Err(AppError::validation(format!(
                "tag value `{}` cannot be changed to `{}`",
                current.value, tag.value
            )));
        }
        let record = self.repo.update_tag_color(id, &tag.color).await?;
        info!(
            target = "vitrine::application::tags",
            tag_id = record.id,
            color = %record.color,
            "tag recoloured"
        );
        Ok(record)
    }

    pub async fn update_color(&self, id: Identity, color: &str) -> Result<TagRecord, AppError> {
        require_text("tag.color", color)?;
        let current = self.get_by_id(id).await?;
        self.update(id, TagRef::new(current.value, color)).await
    }

    pub async fn delete(&self, id: Identity) -> Result<(), AppError> {
        self.repo.delete_tag(id).await?;
        info!(target = "vitrine::application::tags", tag_id = id, "tag deleted");
        Ok(())
    }
}

#[async_trait]
impl Store<TagRecord> for TagStore {
    async fn get_all(&self) -> Result<Vec<TagRecord>, StoreError> {
        self.repo
            .list_tags()
            .await
            .map_err(|err| StoreError::load(TagRecord::ENTITY, err))
    }

    async fn get_by_id(&self, id: Identity) -> Result<TagRecord, StoreError> {
        self.repo
            .find_tag(id)
            .await
            .map_err(|err| StoreError::load(TagRecord::ENTITY, err))?
            .ok_or_else(|| StoreError::not_found(TagRecord::ENTITY, id))
    }
}
