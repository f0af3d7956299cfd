use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{AssetsRepo, RepoError},
    domain::entities::{AssetRecord, NewAsset},
    store::Identity,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: Identity,
    name: String,
    created_at: OffsetDateTime,
    content: Option<Vec<u8>>,
}

impl From<AssetRow> for AssetRecord {
    fn from(row: AssetRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            content: row.content,
        }
    }
}

#[async_trait]
impl AssetsRepo for PostgresRepositories {
    async fn list_assets(&self) -> Result<Vec<AssetRecord>, RepoError> {
        let rows = sqlx::query_as::<_, AssetRow>(
            r#"
            SELECT id, name, created_at, NULL::BYTEA AS content
            FROM assets
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AssetRecord::from).collect())
    }

    async fn find_asset(&self, id: Identity) -> Result<Option<AssetRecord>, RepoError> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            SELECT id, name, created_at, content
            FROM assets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AssetRecord::from))
    }

    async fn find_asset_by_name(&self, name: &str) -> Result<Option<AssetRecord>, RepoError> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            SELECT id, name, created_at, content
            FROM assets
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AssetRecord::from))
    }

    async fn create_asset(&self, asset: &NewAsset) -> Result<AssetRecord, RepoError> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            INSERT INTO assets (name, content)
            VALUES ($1, $2)
            RETURNING id, name, created_at, content
            "#,
        )
        .bind(&asset.name)
        .bind(&asset.content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_asset(&self, id: Identity) -> Result<AssetRecord, RepoError> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            DELETE FROM assets
            WHERE id = $1
            RETURNING id, name, created_at, NULL::BYTEA AS content
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(AssetRecord::from).ok_or(RepoError::NotFound)
    }
}
