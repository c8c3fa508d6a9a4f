//! Bookmark operations, including maintenance of each bookmark's tag set.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use tracing::info;

use super::tags::{resolve_tag_ids, tag_from_row};
use super::users::fetch_user;
use super::{Repository, WriteTx};
use crate::domain::{Bookmark, BookmarkPatch, NewBookmark, Page, Tag};
use crate::error::AppError;

const BOOKMARK_COLUMNS: &str = "id, url, title, description, user_id, created_at, updated_at";

fn bookmark_from_row(row: &SqliteRow, tags: Vec<Tag>) -> Bookmark {
    Bookmark {
        id: row.get("id"),
        url: row.get("url"),
        title: row.get("title"),
        description: row.get("description"),
        user_id: row.get("user_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        tags,
    }
}

fn bookmark_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Bookmark {} not found", id))
}

/// Load the tags of each given bookmark, ordered by tag id.
async fn tags_for_bookmarks(
    conn: &mut SqliteConnection,
    bookmark_ids: &[i64],
) -> Result<HashMap<i64, Vec<Tag>>, sqlx::Error> {
    let mut out: HashMap<i64, Vec<Tag>> = HashMap::with_capacity(bookmark_ids.len());
    if bookmark_ids.is_empty() {
        return Ok(out);
    }

    // SQLite has a 999 parameter limit; chunk to 500 for safety margin.
    const CHUNK_SIZE: usize = 500;

    for chunk in bookmark_ids.chunks(CHUNK_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!(
            r#"
            SELECT bt.bookmark_id, t.id, t.name, t.color, t.created_at
            FROM bookmark_tags bt
            JOIN tags t ON t.id = bt.tag_id
            WHERE bt.bookmark_id IN ({})
            ORDER BY bt.bookmark_id ASC, t.id ASC
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }

        for row in query.fetch_all(&mut *conn).await? {
            out.entry(row.get("bookmark_id"))
                .or_default()
                .push(tag_from_row(&row));
        }
    }

    Ok(out)
}

async fn fetch_bookmark(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Bookmark>, sqlx::Error> {
    let Some(row) = sqlx::query(&format!(
        "SELECT {} FROM bookmarks WHERE id = ?",
        BOOKMARK_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let mut tags = tags_for_bookmarks(conn, &[id]).await?;
    Ok(Some(bookmark_from_row(&row, tags.remove(&id).unwrap_or_default())))
}

/// Replace the bookmark's associations with exactly `tag_ids`.
async fn replace_tag_set(
    conn: &mut SqliteConnection,
    bookmark_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM bookmark_tags WHERE bookmark_id = ?")
        .bind(bookmark_id)
        .execute(&mut *conn)
        .await?;

    for tag_id in tag_ids {
        sqlx::query(
            r#"
            INSERT INTO bookmark_tags (bookmark_id, tag_id)
            VALUES (?, ?)
            ON CONFLICT(bookmark_id, tag_id) DO NOTHING
            "#,
        )
        .bind(bookmark_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

impl Repository {
    /// Create a bookmark for an existing user, creating any tags that do not exist yet.
    ///
    /// An unknown owner is a `Validation` error, since it is a dangling reference
    /// in the request body rather than a missing addressed resource.
    pub async fn create_bookmark(&self, new: &NewBookmark) -> Result<Bookmark, AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<(Bookmark, usize), AppError> = async {
            if fetch_user(&mut tx, new.user_id).await?.is_none() {
                return Err(AppError::Validation(format!(
                    "User {} does not exist",
                    new.user_id
                )));
            }

            let now = Utc::now();
            let id = sqlx::query(
                r#"
                INSERT INTO bookmarks (url, title, description, user_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&new.url)
            .bind(&new.title)
            .bind(new.description.as_deref())
            .bind(new.user_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            let (tag_ids, created_tags) = resolve_tag_ids(&mut tx, &new.tags).await?;
            replace_tag_set(&mut tx, id, &tag_ids).await?;

            let bookmark = fetch_bookmark(&mut tx, id)
                .await?
                .ok_or_else(|| bookmark_not_found(id))?;
            Ok((bookmark, created_tags))
        }
        .await;
        let (bookmark, created_tags) = tx.finish(result).await?;

        info!(
            bookmark_id = bookmark.id,
            user_id = new.user_id,
            tags = bookmark.tags.len(),
            created_tags,
            "Created bookmark"
        );
        Ok(bookmark)
    }

    pub async fn get_bookmark(&self, id: i64) -> Result<Bookmark, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_bookmark(&mut conn, id)
            .await?
            .ok_or_else(|| bookmark_not_found(id))
    }

    /// List bookmarks ordered by id, optionally only those owned by `user_id`.
    pub async fn list_bookmarks(
        &self,
        user_id: Option<i64>,
        page: Page,
    ) -> Result<Vec<Bookmark>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM bookmarks
            WHERE (?1 IS NULL OR user_id = ?1)
            ORDER BY id ASC
            LIMIT ?2 OFFSET ?3
            "#,
            BOOKMARK_COLUMNS
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
        let mut tags = tags_for_bookmarks(&mut conn, &ids).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                bookmark_from_row(row, tags.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    /// Apply a partial update. A supplied tag list replaces the current tag set;
    /// tags that drop off are kept as tags.
    pub async fn update_bookmark(
        &self,
        id: i64,
        patch: &BookmarkPatch,
    ) -> Result<Bookmark, AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<Bookmark, AppError> = async {
            let current = fetch_bookmark(&mut tx, id)
                .await?
                .ok_or_else(|| bookmark_not_found(id))?;

            if patch.is_empty() {
                return Ok(current);
            }

            let url = patch.url.as_deref().unwrap_or(&current.url);
            let title = patch.title.as_deref().unwrap_or(&current.title);
            let description = match &patch.description {
                Some(value) => value.as_deref(),
                None => current.description.as_deref(),
            };

            sqlx::query(
                r#"
                UPDATE bookmarks
                SET url = ?, title = ?, description = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(url)
            .bind(title)
            .bind(description)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if let Some(names) = &patch.tags {
                let (tag_ids, created_tags) = resolve_tag_ids(&mut tx, names).await?;
                replace_tag_set(&mut tx, id, &tag_ids).await?;
                info!(bookmark_id = id, tags = tag_ids.len(), created_tags, "Replaced bookmark tags");
            }

            fetch_bookmark(&mut tx, id)
                .await?
                .ok_or_else(|| bookmark_not_found(id))
        }
        .await;
        let bookmark = tx.finish(result).await?;

        info!(bookmark_id = id, "Updated bookmark");
        Ok(bookmark)
    }

    /// Delete a bookmark and its tag associations. Tags are kept.
    pub async fn delete_bookmark(&self, id: i64) -> Result<(), AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<(), AppError> = async {
            sqlx::query("DELETE FROM bookmark_tags WHERE bookmark_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            let deleted = sqlx::query("DELETE FROM bookmarks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if deleted == 0 {
                return Err(bookmark_not_found(id));
            }
            Ok(())
        }
        .await;
        tx.finish(result).await?;

        info!(bookmark_id = id, "Deleted bookmark");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::domain::{BookmarkPatch, NewTag, Page};
    use crate::error::AppError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_bookmark_reuses_existing_tags() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let go = repo
            .create_tag(&NewTag {
                name: "go".to_string(),
                color: Some("#00ADD8".to_string()),
            })
            .await
            .unwrap();

        let bookmark = repo
            .create_bookmark(&new_bookmark(&user, "https://go.dev/", &["go", "web"]))
            .await
            .unwrap();

        assert_eq!(bookmark.tags.len(), 2);
        assert_eq!(bookmark.tag_names(), vec!["go", "web"]);
        assert_eq!(bookmark.tags[0].id, go.id);
        assert_eq!(bookmark.tags[0].color, "#00ADD8");
        assert_eq!(repo.counts().await.unwrap().tags, 2);
    }

    #[tokio::test]
    async fn test_create_bookmark_unknown_owner_persists_nothing() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let mut new = new_bookmark(&user, "https://a.io/", &["fresh"]);
        new.user_id = 999;

        let err = repo.create_bookmark(&new).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let counts = repo.counts().await.unwrap();
        assert_eq!(counts.bookmarks, 0);
        assert_eq!(counts.tags, 0);
    }

    #[tokio::test]
    async fn test_get_bookmark_includes_tags() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let mut new = new_bookmark(&user, "https://a.io/", &["rust"]);
        new.description = Some("notes".to_string());
        let created = repo.create_bookmark(&new).await.unwrap();

        let fetched = repo.get_bookmark(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.description.as_deref(), Some("notes"));
        assert_eq!(fetched.user_id, user.id);
    }

    #[tokio::test]
    async fn test_get_missing_bookmark() {
        let (repo, _temp) = setup_repo().await;
        assert!(matches!(
            repo.get_bookmark(5).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_replace_tag_set_is_not_additive() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let bookmark = repo
            .create_bookmark(&new_bookmark(&user, "https://a.io/", &["go", "web"]))
            .await
            .unwrap();

        let patch = BookmarkPatch {
            tags: Some(vec!["rust".to_string()]),
            ..Default::default()
        };
        let updated = repo.update_bookmark(bookmark.id, &patch).await.unwrap();

        assert_eq!(updated.tag_names(), vec!["rust"]);
        assert_eq!(updated.title, bookmark.title);
        assert!(updated.updated_at >= bookmark.updated_at);

        let names: Vec<_> = repo
            .list_tags(Page::default())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["go", "web", "rust"]);
    }

    #[tokio::test]
    async fn test_empty_tag_list_clears_tags() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let bookmark = repo
            .create_bookmark(&new_bookmark(&user, "https://a.io/", &["go"]))
            .await
            .unwrap();

        let patch = BookmarkPatch {
            tags: Some(vec![]),
            ..Default::default()
        };
        let updated = repo.update_bookmark(bookmark.id, &patch).await.unwrap();
        assert!(updated.tags.is_empty());
    }

    #[tokio::test]
    async fn test_description_absent_vs_null() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let mut new = new_bookmark(&user, "https://a.io/", &["go"]);
        new.description = Some("keep me".to_string());
        let bookmark = repo.create_bookmark(&new).await.unwrap();

        let retitle = BookmarkPatch {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let updated = repo.update_bookmark(bookmark.id, &retitle).await.unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert_eq!(updated.tag_names(), vec!["go"]);

        let clear = BookmarkPatch {
            description: Some(None),
            ..Default::default()
        };
        let cleared = repo.update_bookmark(bookmark.id, &clear).await.unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.title, "New title");
    }

    #[tokio::test]
    async fn test_update_missing_bookmark() {
        let (repo, _temp) = setup_repo().await;
        let err = repo
            .update_bookmark(3, &BookmarkPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_bookmark_keeps_tags() {
        let (repo, _temp) = setup_repo().await;
        let user = repo.create_user(&new_user("alice")).await.unwrap();
        let bookmark = repo
            .create_bookmark(&new_bookmark(&user, "https://a.io/", &["go", "web"]))
            .await
            .unwrap();

        repo.delete_bookmark(bookmark.id).await.unwrap();

        assert!(matches!(
            repo.get_bookmark(bookmark.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert_eq!(repo.counts().await.unwrap().tags, 2);
        for tag in &bookmark.tags {
            assert_eq!(repo.tag_usage(tag.id).await.unwrap().bookmark_count, 0);
        }

        assert!(matches!(
            repo.delete_bookmark(bookmark.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_bookmarks_filtered_by_user() {
        let (repo, _temp) = setup_repo().await;
        let alice = repo.create_user(&new_user("alice")).await.unwrap();
        let bob = repo.create_user(&new_user("bob")).await.unwrap();

        let a1 = repo
            .create_bookmark(&new_bookmark(&alice, "https://a.io/1", &["go"]))
            .await
            .unwrap();
        repo.create_bookmark(&new_bookmark(&bob, "https://b.io/1", &[]))
            .await
            .unwrap();
        let a2 = repo
            .create_bookmark(&new_bookmark(&alice, "https://a.io/2", &["web"]))
            .await
            .unwrap();

        let alices = repo
            .list_bookmarks(Some(alice.id), Page::default())
            .await
            .unwrap();
        let ids: Vec<_> = alices.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![a1.id, a2.id]);
        assert!(alices.iter().all(|b| b.user_id == alice.id));
        assert_eq!(alices[1].tag_names(), vec!["web"]);

        let all = repo.list_bookmarks(None, Page::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let paged = repo
            .list_bookmarks(None, Page { skip: 2, limit: 5 })
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, a2.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_share_new_tag() {
        let (repo, _temp) = setup_repo().await;
        let owner = repo.create_user(&new_user("alice")).await.unwrap();
        let repo = Arc::new(repo);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                let new = new_bookmark(&owner, &format!("https://a.io/{}", i), &["shared"]);
                tokio::spawn(async move { repo.create_bookmark(&new).await })
            })
            .collect();

        for handle in handles {
            let bookmark = handle.await.unwrap().unwrap();
            assert_eq!(bookmark.tags.len(), 1);
        }

        let counts = repo.counts().await.unwrap();
        assert_eq!(counts.bookmarks, 8);
        assert_eq!(counts.tags, 1);

        let tag = &repo.list_tags(Page::default()).await.unwrap()[0];
        assert_eq!(tag.name, "shared");
        assert_eq!(repo.tag_usage(tag.id).await.unwrap().bookmark_count, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tag_set_updates_race_tag_create() {
        let (repo, _temp) = setup_repo().await;
        let owner = repo.create_user(&new_user("alice")).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..4 {
            let bookmark = repo
                .create_bookmark(&new_bookmark(&owner, &format!("https://a.io/{}", i), &["go"]))
                .await
                .unwrap();
            ids.push(bookmark.id);
        }
        let repo = Arc::new(repo);

        let mut handles = Vec::new();
        for (i, id) in ids.iter().copied().enumerate() {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let patch = BookmarkPatch {
                    tags: Some(vec!["go".to_string(), format!("t{}", i % 2)]),
                    ..Default::default()
                };
                repo.update_bookmark(id, &patch).await.map(|_| ())
            }));
        }
        let creator = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            let new = NewTag {
                name: "t0".to_string(),
                color: None,
            };
            match creator.create_tag(&new).await {
                Ok(_) | Err(AppError::Conflict(_)) => Ok(()),
                Err(other) => Err(other),
            }
        }));

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counts = repo.counts().await.unwrap();
        assert_eq!(counts.bookmarks, 4);
        assert_eq!(counts.tags, 3);
        assert_eq!(
            repo.get_bookmark(ids[0]).await.unwrap().tag_names(),
            vec!["go", "t0"]
        );
    }
}
