//! Tag operations and the tag-name resolution used by bookmark writes.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::info;

use super::{Repository, WriteTx};
use crate::domain::{NewTag, Page, Tag, TagPatch, TagUsage, DEFAULT_TAG_COLOR};
use crate::error::AppError;

pub(super) const TAG_COLUMNS: &str = "id, name, color, created_at";

pub(super) fn tag_from_row(row: &SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn tag_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Tag {} not found", id))
}

async fn fetch_tag(conn: &mut SqliteConnection, id: i64) -> Result<Option<Tag>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(tag_from_row))
}

async fn ensure_name_available(
    conn: &mut SqliteConnection,
    name: &str,
    except_id: Option<i64>,
) -> Result<(), AppError> {
    let taken = sqlx::query("SELECT 1 FROM tags WHERE name = ? AND id IS NOT ? LIMIT 1")
        .bind(name)
        .bind(except_id)
        .fetch_optional(&mut *conn)
        .await?
        .is_some();

    if taken {
        return Err(AppError::Conflict(format!(
            "Tag with name '{}' already exists",
            name
        )));
    }
    Ok(())
}

/// Resolve tag names to ids, creating missing tags with the default color.
///
/// Returns the ids in input order and how many tags were newly created.
pub(super) async fn resolve_tag_ids(
    conn: &mut SqliteConnection,
    names: &[String],
) -> Result<(Vec<i64>, usize), sqlx::Error> {
    let now = Utc::now();
    let mut ids = Vec::with_capacity(names.len());
    let mut created = 0usize;

    for name in names {
        let result = sqlx::query(
            r#"
            INSERT INTO tags (name, color, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(DEFAULT_TAG_COLOR)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() > 0 {
            created += 1;
            ids.push(result.last_insert_rowid());
            continue;
        }

        let id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        ids.push(id);
    }

    Ok((ids, created))
}

impl Repository {
    pub async fn create_tag(&self, new: &NewTag) -> Result<Tag, AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<Tag, AppError> = async {
            ensure_name_available(&mut tx, &new.name, None).await?;

            let id = sqlx::query("INSERT INTO tags (name, color, created_at) VALUES (?, ?, ?)")
                .bind(&new.name)
                .bind(new.color.as_deref().unwrap_or(DEFAULT_TAG_COLOR))
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

            fetch_tag(&mut tx, id)
                .await?
                .ok_or_else(|| tag_not_found(id))
        }
        .await;
        let tag = tx.finish(result).await?;

        info!(tag_id = tag.id, name = %tag.name, "Created tag");
        Ok(tag)
    }

    pub async fn get_tag(&self, id: i64) -> Result<Tag, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_tag(&mut conn, id)
            .await?
            .ok_or_else(|| tag_not_found(id))
    }

    pub async fn list_tags(&self, page: Page) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tags ORDER BY id ASC LIMIT ? OFFSET ?",
            TAG_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Rename and/or recolor a tag.
    pub async fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<Tag, AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<Tag, AppError> = async {
            let current = fetch_tag(&mut tx, id)
                .await?
                .ok_or_else(|| tag_not_found(id))?;

            let name = patch.name.as_deref().unwrap_or(&current.name);
            let color = patch.color.as_deref().unwrap_or(&current.color);

            if name != current.name {
                ensure_name_available(&mut tx, name, Some(id)).await?;
            }

            sqlx::query("UPDATE tags SET name = ?, color = ? WHERE id = ?")
                .bind(name)
                .bind(color)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            fetch_tag(&mut tx, id)
                .await?
                .ok_or_else(|| tag_not_found(id))
        }
        .await;
        let tag = tx.finish(result).await?;

        info!(tag_id = id, name = %tag.name, "Updated tag");
        Ok(tag)
    }

    /// Delete a tag and detach it from every bookmark. Bookmarks are kept.
    pub async fn delete_tag(&self, id: i64) -> Result<(), AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<u64, AppError> = async {
            let detached = sqlx::query("DELETE FROM bookmark_tags WHERE tag_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            let deleted = sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if deleted == 0 {
                return Err(tag_not_found(id));
            }
            Ok(detached)
        }
        .await;
        let detached = tx.finish(result).await?;

        info!(tag_id = id, detached, "Deleted tag");
        Ok(())
    }

    pub async fn tag_usage(&self, id: i64) -> Result<TagUsage, AppError> {
        let row = sqlx::query(
            r#"
            SELECT t.id, t.name, COUNT(bt.bookmark_id) AS bookmark_count
            FROM tags t
            LEFT JOIN bookmark_tags bt ON bt.tag_id = t.id
            WHERE t.id = ?
            GROUP BY t.id, t.name
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| tag_not_found(id))?;

        Ok(TagUsage {
            tag_id: row.get("id"),
            tag_name: row.get("name"),
            bookmark_count: row.get("bookmark_count"),
        })
    }
}
