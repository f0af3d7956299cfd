use async_trait::async_trait;

use crate::{
    application::repos::{ProjectsRepo, RepoError},
    domain::entities::{ProjectOverride, TagRef},
    store::Identity,
    util::ordered_map::OrderedMap,
};

use super::{
    PostgresRepositories, map_sqlx_error,
    tags::{TagRefRow, resolve_tags},
};

const OVERRIDE_ROWS_SQL: &str = r#"
    SELECT p.id, p.description, p.image_link, p.hidden, t.value AS tag_value, t.color AS tag_color
    FROM projects p
    LEFT JOIN project_tags pt ON pt.project_id = p.id
    LEFT JOIN tags t ON t.id = pt.tag_id
"#;

#[derive(sqlx::FromRow)]
struct OverrideTagRow {
    id: Identity,
    description: Option<String>,
    image_link: Option<String>,
    hidden: bool,
    tag_value: Option<String>,
    tag_color: Option<String>,
}

fn fold_rows(rows: Vec<OverrideTagRow>) -> Vec<ProjectOverride> {
    let mut overrides: OrderedMap<Identity, ProjectOverride> = OrderedMap::new();
    for row in rows {
        let tag = row
            .tag_value
            .zip(row.tag_color)
            .map(|(value, color)| TagRef::new(value, color));
        match overrides.get_mut(&row.id) {
            Some(entry) => entry.tags.extend(tag),
            None => overrides.set(
                row.id,
                ProjectOverride {
                    id: row.id,
                    description: row.description,
                    image_link: row.image_link,
                    hidden: row.hidden,
                    tags: tag.into_iter().collect(),
                },
            ),
        }
    }
    overrides.into_iter().map(|(_, entry)| entry).collect()
}

#[async_trait]
impl ProjectsRepo for PostgresRepositories {
    async fn list_overrides(&self) -> Result<Vec<ProjectOverride>, RepoError> {
        let rows = sqlx::query_as::<_, OverrideTagRow>(&format!(
            "{OVERRIDE_ROWS_SQL} ORDER BY p.id, pt.position"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(fold_rows(rows))
    }

    async fn find_override(&self, id: Identity) -> Result<Option<ProjectOverride>, RepoError> {
        let rows = sqlx::query_as::<_, OverrideTagRow>(&format!(
            "{OVERRIDE_ROWS_SQL} WHERE p.id = $1 ORDER BY pt.position"
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(fold_rows(rows).into_iter().next())
    }

    async fn save_override(&self, entry: &ProjectOverride) -> Result<ProjectOverride, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, description, image_link, hidden)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET description = EXCLUDED.description,
                image_link = EXCLUDED.image_link,
                hidden = EXCLUDED.hidden
            "#,
        )
        .bind(entry.id)
        .bind(entry.description.as_deref())
        .bind(entry.image_link.as_deref())
        .bind(entry.hidden)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM project_tags WHERE project_id = $1")
            .bind(entry.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let resolved = resolve_tags(&mut *tx, &entry.tags).await?;
        for (position, (tag_id, _)) in resolved.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO project_tags (project_id, tag_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(entry.id)
            .bind(*tag_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(ProjectOverride {
            tags: resolved.into_iter().map(|(_, tag)| tag).collect(),
            ..entry.clone()
        })
    }

    async fn project_tags(&self) -> Result<Vec<TagRef>, RepoError> {
        let rows = sqlx::query_as::<_, TagRefRow>(
            r#"
            SELECT t.value, t.color
            FROM tags t
            WHERE EXISTS (SELECT 1 FROM project_tags pt WHERE pt.tag_id = t.id)
            ORDER BY LOWER(t.value), t.value
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRef::from).collect())
    }

    async fn shared_project_tags(&self, value: &str) -> Result<Vec<TagRef>, RepoError> {
        let rows = sqlx::query_as::<_, TagRefRow>(
            r#"
            SELECT DISTINCT t.value, t.color
            FROM tags t
            INNER JOIN project_tags pt ON pt.tag_id = t.id
            WHERE t.value <> $1
              AND pt.project_id IN (
                  SELECT shared.project_id
                  FROM project_tags shared
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
