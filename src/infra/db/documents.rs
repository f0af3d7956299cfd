use async_trait::async_trait;
use sqlx::PgConnection;
use time::OffsetDateTime;

use crate::{
    application::repos::{DocumentsRepo, RepoError},
    domain::entities::{DocumentRecord, NewDocument, TagRef},
    store::Identity,
    util::ordered_map::OrderedMap,
};

use super::{
    PostgresRepositories, map_sqlx_error,
    tags::{TagRefRow, resolve_tags},
};

const DOCUMENT_ROWS_SQL: &str = r#"
    SELECT d.id, d.title, d.content, d.created_at, t.value AS tag_value, t.color AS tag_color
    FROM documents d
    LEFT JOIN document_tags dt ON dt.document_id = d.id
    LEFT JOIN tags t ON t.id = dt.tag_id
"#;

/// One document joined with at most one of its tags.
#[derive(sqlx::FromRow)]
struct DocumentTagRow {
    id: Identity,
    title: String,
    content: String,
    created_at: OffsetDateTime,
    tag_value: Option<String>,
    tag_color: Option<String>,
}

/// Fold joined rows into documents, keeping the order documents first appear in.
fn fold_rows(rows: Vec<DocumentTagRow>) -> Vec<DocumentRecord> {
    let mut documents: OrderedMap<Identity, DocumentRecord> = OrderedMap::new();
    for row in rows {
        let tag = match (row.tag_value, row.tag_color) {
            (Some(value), Some(color)) => Some(TagRef::new(value, color)),
            _ => None,
        };
        match documents.get_mut(&row.id) {
            Some(document) => document.tags.extend(tag),
            None => documents.set(
                row.id,
                DocumentRecord {
                    id: row.id,
                    title: row.title,
                    content: row.content,
                    tags: tag.into_iter().collect(),
                    created_at: row.created_at,
                },
            ),
        }
    }
    documents.into_iter().map(|(_, document)| document).collect()
}

/// Link `tags` to the document in their given order.
async fn link_tags(
    conn: &mut PgConnection,
    document_id: Identity,
    tags: &[TagRef],
) -> Result<Vec<TagRef>, RepoError> {
    let resolved = resolve_tags(&mut *conn, tags).await?;
    for (position, (tag_id, _)) in resolved.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO document_tags (document_id, tag_id, position)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(document_id)
        .bind(*tag_id)
        .bind(position as i32)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    }
    Ok(resolved.into_iter().map(|(_, tag)| tag).collect())
}

#[async_trait]
impl DocumentsRepo for PostgresRepositories {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, DocumentTagRow>(&format!(
            "{DOCUMENT_ROWS_SQL} ORDER BY d.id, dt.position"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(fold_rows(rows))
    }

    async fn find_document(&self, id: Identity) -> Result<Option<DocumentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, DocumentTagRow>(&format!(
            "{DOCUMENT_ROWS_SQL} WHERE d.id = $1 ORDER BY dt.position"
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(fold_rows(rows).into_iter().next())
    }

    async fn create_document(&self, document: &NewDocument) -> Result<DocumentRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id: Identity = sqlx::query_scalar(
            r#"
            INSERT INTO documents (title, content, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let tags = link_tags(&mut *tx, id, &document.tags).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DocumentRecord {
            id,
            title: document.title.clone(),
            content: document.content.clone(),
            tags,
            created_at: document.created_at,
        })
    }

    async fn update_document(
        &self,
        id: Identity,
        document: &NewDocument,
    ) -> Result<DocumentRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE documents
            SET title = $2, content = $3, created_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query("DELETE FROM document_tags WHERE document_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let tags = link_tags(&mut *tx, id, &document.tags).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DocumentRecord {
            id,
            title: document.title.clone(),
            content: document.content.clone(),
            tags,
            created_at: document.created_at,
        })
    }

    async fn delete_document(&self, id: Identity) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn document_tags(&self) -> Result<Vec<TagRef>, RepoError> {
        let rows = sqlx::query_as::<_, TagRefRow>(
            r#"
            SELECT t.value, t.color
            FROM tags t
            WHERE EXISTS (SELECT 1 FROM document_tags dt WHERE dt.tag_id = t.id)
            ORDER BY LOWER(t.value), t.value
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRef::from).collect())
    }

    async fn shared_document_tags(&self, value: &str) -> Result<Vec<TagRef>, RepoError> {
        let rows = sqlx::query_as::<_, TagRefRow>(
            r#"
            SELECT DISTINCT t.value, t.color
            FROM tags t
            INNER JOIN document_tags dt ON dt.tag_id = t.id
            WHERE t.value <> $1
              AND dt.document_id IN (
                  SELECT shared.document_id
                  FROM document_tags shared
                  INNER JOIN tags st ON st.id = shared.tag_id
                  WHERE st.value = $1
              )
            ORDER BY t.value
            "#,
        )
        .bind(value)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRef::from).collect())
    }
}
