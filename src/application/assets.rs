use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::{
    application::{
        error::AppError,
        repos::{AssetsRepo, RepoError},
    },
    cache::{CacheOptions, Cached, codec},
    domain::entities::{AssetRecord, NewAsset},
    store::{Identity, Indexable, Store, StoreError},
};

pub const BY_ID_IDENTITY: &str = "assets::by_id";
pub const BY_NAME_IDENTITY: &str = "assets::by_name";

pub const ASSET_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Live store over asset metadata. Single lookups return the full record,
/// content included, and are memoized in the process-local cache.
#[derive(Clone)]
pub struct AssetStore {
    repo: Arc<dyn AssetsRepo>,
    cache: CacheOptions,
}

impl AssetStore {
    pub fn new(repo: Arc<dyn AssetsRepo>) -> Self {
        Self::with_cache(repo, CacheOptions::default().with_max_age(ASSET_MAX_AGE))
    }

    /// Asset content is never written to the persisted tier.
    pub fn with_cache(repo: Arc<dyn AssetsRepo>, cache: CacheOptions) -> Self {
        Self {
            repo,
            cache: cache.local_only(),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<AssetRecord, StoreError> {
        let repo = Arc::clone(&self.repo);
        let owned = name.to_string();
        self.load(BY_NAME_IDENTITY, name, move || {
            let repo = Arc::clone(&repo);
            let name = owned.clone();
            async move {
                let found = repo.find_asset_by_name(&name).await;
                encode_found(found, || StoreError::key_not_found(AssetRecord::ENTITY, name))
            }
        })
        .await
    }

    pub async fn add(&self, asset: NewAsset) -> Result<AssetRecord, AppError> {
        asset.validate()?;
        let record = self.repo.create_asset(&asset).await?;
        self.evict(&record);
        info!(
            target = "vitrine::application::assets",
            asset_id = record.id,
            name = %record.name,
            bytes = asset.content.len(),
            "asset stored"
        );
        Ok(record)
    }

    /// Remove the asset and its memoized lookups, by id and by name.
    pub async fn delete(&self, id: Identity) -> Result<(), AppError> {
        let removed = self.repo.delete_asset(id).await?;
        self.evict(&removed);
        info!(
            target = "vitrine::application::assets",
            asset_id = removed.id,
            name = %removed.name,
            "asset deleted"
        );
        Ok(())
    }

    fn evict(&self, asset: &AssetRecord) {
        self.cache
            .forget(BY_ID_IDENTITY, Some(asset.id.to_string().as_str()));
        self.cache.forget(BY_NAME_IDENTITY, Some(asset.name.as_str()));
    }

    async fn load<F, Fut>(
        &self,
        identity: &str,
        param: &str,
        lookup: F,
    ) -> Result<AssetRecord, StoreError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<Bytes, StoreError>> + Send,
    {
        let bytes = Cached::with_param(identity, param, lookup, self.cache.clone())
            .call()
            .await?;
        codec::decode(&bytes).map_err(|err| StoreError::load(AssetRecord::ENTITY, err))
    }
}

fn encode_found(
    found: Result<Option<AssetRecord>, RepoError>,
    missing: impl FnOnce() -> StoreError,
) -> Result<Bytes, StoreError> {
    let asset = found
        .map_err(|err| StoreError::load(AssetRecord::ENTITY, err))?
        .ok_or_else(missing)?;
    codec::encode(&asset).map_err(|err| StoreError::load(AssetRecord::ENTITY, err))
}

#[async_trait]
impl Store<AssetRecord> for AssetStore {
    async fn get_all(&self) -> Result<Vec<AssetRecord>, StoreError> {
        self.repo
            .list_assets()
            .await
            .map_err(|err| StoreError::load(AssetRecord::ENTITY, err))
    }

    async fn get_by_id(&self, id: Identity) -> Result<AssetRecord, StoreError> {
        let repo = Arc::clone(&self.repo);
        self.load(BY_ID_IDENTITY, &id.to_string(), move || {
            let repo = Arc::clone(&repo);
            async move {
                let found = repo.find_asset(id).await;
                encode_found(found, || StoreError::not_found(AssetRecord::ENTITY, id))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::application::testing::MemoryRepos;
    use crate::cache::LocalCache;
    use crate::store::StoreExt;

    fn store(repos: &MemoryRepos) -> AssetStore {
        AssetStore::with_cache(
            Arc::new(repos.clone()),
            CacheOptions::default().with_local(Arc::new(LocalCache::new())),
        )
    }

    #[tokio::test]
    async fn listing_carries_metadata_only() {
        let repos = MemoryRepos::seeded();
        let assets = store(&repos).get_all().await.expect("assets");
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().all(|asset| !asset.is_loaded()));
    }

    #[tokio::test]
    async fn lookups_load_content_once() {
        let repos = MemoryRepos::seeded();
        let store = store(&repos);

        let first = store.get_by_id(1).await.expect("by id");
        let second = store.get_by_id(1).await.expect("cached");
        assert_eq!(first, second);
        assert_eq!(first.content.as_deref(), Some(&[137, 80, 78, 71][..]));

        let by_name = store.get_by_name("cv.pdf").await.expect("by name");
        store.get_by_name("cv.pdf").await.expect("cached");
        assert_eq!(by_name.id, 2);

        assert_eq!(repos.asset_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_assets_are_not_found_and_not_cached() {
        let repos = MemoryRepos::seeded();
        let store = store(&repos);

        assert!(store.get_by_id(77).await.expect_err("id").is_not_found());
        assert!(store.get_by_id(77).await.expect_err("id").is_not_found());
        let err = store.get_by_name("missing.svg").await.expect_err("name");
        assert_eq!(err.to_string(), "asset `missing.svg` not found");

        assert_eq!(repos.asset_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn delete_evicts_cached_lookups() {
        let repos = MemoryRepos::seeded();
        let store = store(&repos);

        store.get_by_id(1).await.expect("by id");
        store.get_by_name("logo.png").await.expect("by name");
        store.get_by_name("cv.pdf").await.expect("other asset");
        assert_eq!(store.cache.local.len(), 3);

        store.delete(1).await.expect("delete");
        assert_eq!(store.cache.local.len(), 1);

        assert!(store.get_by_id(1).await.expect_err("by id").is_not_found());
        assert!(store.get_by_name("logo.png").await.expect_err("by name").is_not_found());
        assert_eq!(repos.asset_reads.load(Ordering::SeqCst), 5);

        assert!(store.delete(1).await.expect_err("gone").is_not_found());
    }

    #[tokio::test]
    async fn add_stores_content_under_a_unique_name() {
        let repos = MemoryRepos::seeded();
        let store = store(&repos);

        assert!(store.get_by_name("avatar.webp").await.is_err());
        let record = store
            .add(NewAsset {
                name: "avatar.webp".to_string(),
                content: b"RIFF".to_vec(),
            })
            .await
            .expect("add");
        assert_eq!(record.id, 3);

        let loaded = store.get_by_name("avatar.webp").await.expect("by name");
        assert_eq!(loaded.content.as_deref(), Some(&b"RIFF"[..]));

        let err = store
            .add(NewAsset {
                name: "logo.png".to_string(),
                content: Vec::new(),
            })
            .await
            .expect_err("taken name");
        assert!(matches!(err, AppError::Repo(RepoError::Duplicate { .. })));
        assert_eq!(store.get_all().await.expect("assets").len(), 3);
    }

    #[tokio::test]
    async fn persisted_tier_is_never_used() {
        let repos = MemoryRepos::seeded();
        let store = AssetStore::new(Arc::new(repos));
        assert!(store.cache.external.is_none());
        assert_eq!(store.cache.max_age, ASSET_MAX_AGE);
    }

    #[tokio::test]
    async fn derived_views_keep_listing_semantics() {
        let repos = MemoryRepos::seeded();
        let pdfs = store(&repos)
            .filter(|asset| asset.name.ends_with(".pdf"))
            .await
            .expect("filter");
        assert_eq!(pdfs.len(), 1);
        assert!(pdfs.get_by_id(1).await.is_err());
    }
}
