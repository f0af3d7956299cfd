//! Projects: the code host's repository listing merged with local overrides.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    application::{error::AppError, repos::ProjectsRepo},
    cache::{CacheOptions, Cached, codec},
    domain::entities::{ProjectOverride, ProjectRecord, TagRef},
    store::{Identity, Indexable, Store, StoreError},
};

/// Cache identity of the repository listing fetch.
pub const LISTING_IDENTITY: &str = "projects::github_repositories";

pub const LISTING_MAX_AGE: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to `{location}` failed: {message}")]
    Request { location: String, message: String },
    #[error("`{location}` answered with status {status}")]
    Status { location: String, status: u16 },
}

/// Where the raw repository listing comes from.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Stable description of the listing, used as the cache parameter.
    fn location(&self) -> &str;

    /// The raw JSON listing.
    async fn fetch(&self) -> Result<Bytes, SourceError>;
}

/// One entry of the code host's repository listing.
#[derive(Debug, Deserialize)]
struct ListedRepository {
    id: Identity,
    name: String,
    description: Option<String>,
    html_url: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pushed_at: Option<OffsetDateTime>,
}

impl From<ListedRepository> for ProjectRecord {
    fn from(listed: ListedRepository) -> Self {
        Self {
            id: listed.id,
            name: listed.name,
            description: listed.description,
            url: listed.html_url,
            image_link: None,
            hidden: false,
            tags: Vec::new(),
            created_at: listed.created_at,
            pushed_at: listed.pushed_at,
        }
    }
}

/// Live store over every listed project.
#[derive(Clone)]
pub struct ProjectStore {
    source: Arc<dyn ProjectSource>,
    repo: Arc<dyn ProjectsRepo>,
    cache: CacheOptions,
}

impl ProjectStore {
    /// `cache` should carry the persisted tier so a restarted process does not
    /// hit the code host again.
    pub fn new(
        source: Arc<dyn ProjectSource>,
        repo: Arc<dyn ProjectsRepo>,
        cache: CacheOptions,
    ) -> Self {
        Self {
            source,
            repo,
            cache,
        }
    }

    pub async fn all_tags(&self) -> Result<Vec<TagRef>, StoreError> {
        self.repo
            .project_tags()
            .await
            .map_err(|err| StoreError::load(ProjectRecord::ENTITY, err))
    }

    pub async fn shared_tags(&self, value: &str) -> Result<Vec<TagRef>, StoreError> {
        self.repo
            .shared_project_tags(value)
            .await
            .map_err(|err| StoreError::load(ProjectRecord::ENTITY, err))
    }

    /// Store the local presentation data of a listed project and return the merged record.
    ///
    /// Only projects the code host currently lists can carry an override.
    pub async fn update_override(
        &self,
        entry: ProjectOverride,
    ) -> Result<ProjectRecord, AppError> {
        entry.validate()?;
        let project = self
            .listed()
            .await?
            .into_iter()
            .find(|project| project.id == entry.id)
            .ok_or_else(|| StoreError::not_found(ProjectRecord::ENTITY, entry.id))?;

        let saved = self.repo.save_override(&entry).await?;
        info!(
            target = "vitrine::application::projects",
            project_id = saved.id,
            hidden = saved.hidden,
            tags = saved.tags.len(),
            "project override saved"
        );
        Ok(project.merge(saved))
    }

    async fn listed(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        let source = Arc::clone(&self.source);
        let cached = Cached::with_param(
            LISTING_IDENTITY,
            self.source.location(),
            move || {
                let source = Arc::clone(&source);
                async move { source.fetch().await }
            },
            self.cache.clone(),
        );

        let body = cached
            .call()
            .await
            .map_err(|err| StoreError::load(ProjectRecord::ENTITY, err))?;
        let listed: Vec<ListedRepository> = codec::decode(&body)
            .map_err(|err| StoreError::load(ProjectRecord::ENTITY, err))?;

        Ok(listed.into_iter().map(ProjectRecord::from).collect())
    }
}

#[async_trait]
impl Store<ProjectRecord> for ProjectStore {
    async fn get_all(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        let listed = self.listed().await?;
        let mut overrides: HashMap<Identity, _> = self
            .repo
            .list_overrides()
            .await
            .map_err(|err| StoreError::load(ProjectRecord::ENTITY, err))?
            .into_iter()
            .map(|entry| (entry.id, entry))
            .collect();

        Ok(listed
            .into_iter()
            .map(|project| match overrides.remove(&project.id) {
                Some(local) => project.merge(local),
                None => project,
            })
            .collect())
    }

    async fn get_by_id(&self, id: Identity) -> Result<ProjectRecord, StoreError> {
        let project = self
            .listed()
            .await?
            .into_iter()
            .find(|project| project.id == id)
            .ok_or_else(|| StoreError::not_found(ProjectRecord::ENTITY, id))?;

        let local = self
            .repo
            .find_override(id)
            .await
            .map_err(|err| StoreError::load(ProjectRecord::ENTITY, err))?;

        Ok(match local {
            Some(local) => project.merge(local),
            None => project,
        })
    }
}
