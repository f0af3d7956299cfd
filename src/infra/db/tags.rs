use async_trait::async_trait;
use sqlx::PgConnection;

use crate::{
    application::repos::{RepoError, TagsRepo},
    domain::entities::{TagRecord, TagRef},
    store::Identity,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
pub(super) struct TagRow {
    id: Identity,
    value: String,
    color: String,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            value: row.value,
            color: row.color,
        }
    }
}

/// `value`/`color` pair selected from a join.
#[derive(sqlx::FromRow)]
pub(super) struct TagRefRow {
    value: String,
    color: String,
}

impl From<TagRefRow> for TagRef {
    fn from(row: TagRefRow) -> Self {
        TagRef::new(row.value, row.color)
    }
}

/// Resolve tags by value on `conn`, creating the unknown ones with the supplied
/// colour. Existing tags keep their colour and repeated values are dropped.
pub(super) async fn resolve_tags(
    conn: &mut PgConnection,
    tags: &[TagRef],
) -> Result<Vec<(Identity, TagRef)>, RepoError> {
    let mut resolved: Vec<(Identity, TagRef)> = Vec::with_capacity(tags.len());
    for tag in tags {
        if resolved.iter().any(|(_, linked)| linked.value == tag.value) {
            continue;
        }

        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (value, color)
            VALUES ($1, $2)
            ON CONFLICT (value) DO UPDATE SET value = EXCLUDED.value
            RETURNING id, value, color
            "#,
        )
        .bind(&tag.value)
        .bind(&tag.color)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        resolved.push((row.id, TagRef::new(row.value, row.color)));
    }
    Ok(resolved)
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, value, color
            FROM tags
            ORDER BY LOWER(value), id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    async fn find_tag(&self, id: Identity) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, value, color
            FROM tags
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }

    async fn find_tag_by_value(&self, value: &str) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, value, color
            FROM tags
            WHERE value = $1
            "#,
        )
        .bind(value)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }

    async fn save_tag(&self, tag: &TagRef) -> Result<TagRecord, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (value, color)
            VALUES ($1, $2)
            ON CONFLICT (value) DO UPDATE SET color = EXCLUDED.color
            RETURNING id, value, color
            "#,
        )
        .bind(&tag.value)
        .bind(&tag.color)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_tag_color(&self, id: Identity, color: &str) -> Result<TagRecord, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            UPDATE tags
            SET color = $2
            WHERE id = $1
            RETURNING id, value, color
            "#,
        )
        .bind(id)
        .bind(color)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(TagRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_tag(&self, id: Identity) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
