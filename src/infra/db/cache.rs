use async_trait::async_trait;
use bytes::Bytes;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;

use crate::cache::{CacheElement, CacheError, CacheKey, ExternalCache};

/// The `cache` table: the persisted tier shared by every process of the site.
#[derive(Clone)]
pub struct PgCacheTable {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    cache_value: Vec<u8>,
    valid_to: OffsetDateTime,
}

impl PgCacheTable {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExternalCache for PgCacheTable {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheElement>, CacheError> {
        let row = sqlx::query_as::<_, CacheRow>(
            r#"
            SELECT cache_value, valid_to
            FROM cache
            WHERE cache_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(CacheError::backend)?;

        Ok(row.map(|row| CacheElement::new(Bytes::from(row.cache_value), row.valid_to)))
    }

    async fn put(&self, key: &CacheKey, element: &CacheElement) -> Result<(), CacheError> {
        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await.map_err(CacheError::backend)?;

        sqlx::query(
            r#"
            INSERT INTO cache (cache_key, cache_value, valid_to)
            VALUES ($1, $2, $3)
            ON CONFLICT (cache_key)
            DO UPDATE SET cache_value = EXCLUDED.cache_value, valid_to = EXCLUDED.valid_to
            "#,
        )
        .bind(key.as_str())
        .bind(element.value.as_ref())
        .bind(element.valid_to)
        .execute(&mut *tx)
        .await
        .map_err(CacheError::backend)?;

        tx.commit().await.map_err(CacheError::backend)?;
        debug!(key = %key, valid_to = %element.valid_to, "persisted cache entry");
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM cache WHERE valid_to <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(CacheError::backend)?;
        Ok(result.rows_affected())
    }
}
