//! User operations.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::info;

use super::{Repository, WriteTx};
use crate::domain::{NewUser, Page, User, UserPatch};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, username, email, created_at";

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn user_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

pub(super) async fn fetch_user(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Fail with `Conflict` if `column` already holds `value` on a user other than `except_id`.
async fn ensure_available(
    conn: &mut SqliteConnection,
    column: &'static str,
    value: &str,
    except_id: Option<i64>,
) -> Result<(), AppError> {
    let taken = sqlx::query(&format!(
        "SELECT 1 FROM users WHERE {} = ? AND id IS NOT ? LIMIT 1",
        column
    ))
    .bind(value)
    .bind(except_id)
    .fetch_optional(&mut *conn)
    .await?
    .is_some();

    if taken {
        return Err(AppError::Conflict(format!(
            "A user with this {} already exists",
            column
        )));
    }
    Ok(())
}

impl Repository {
    /// Create a user. Fails with `Conflict` if the username or email is taken.
    pub async fn create_user(&self, new: &NewUser) -> Result<User, AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<User, AppError> = async {
            ensure_available(&mut tx, "username", &new.username, None).await?;
            ensure_available(&mut tx, "email", &new.email, None).await?;

            let id = sqlx::query("INSERT INTO users (username, email, created_at) VALUES (?, ?, ?)")
                .bind(&new.username)
                .bind(&new.email)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

            fetch_user(&mut tx, id)
                .await?
                .ok_or_else(|| user_not_found(id))
        }
        .await;
        let user = tx.finish(result).await?;

        info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    /// List users ordered by id.
    pub async fn list_users(&self, page: Page) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY id ASC LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Apply a partial update. Unchanged values are not re-checked for uniqueness.
    pub async fn update_user(&self, id: i64, patch: &UserPatch) -> Result<User, AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<User, AppError> = async {
            let current = fetch_user(&mut tx, id)
                .await?
                .ok_or_else(|| user_not_found(id))?;

            let username = patch.username.as_deref().unwrap_or(&current.username);
            let email = patch.email.as_deref().unwrap_or(&current.email);

            if username != current.username {
                ensure_available(&mut tx, "username", username, Some(id)).await?;
            }
            if email != current.email {
                ensure_available(&mut tx, "email", email, Some(id)).await?;
            }

            sqlx::query("UPDATE users SET username = ?, email = ? WHERE id = ?")
                .bind(username)
                .bind(email)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            fetch_user(&mut tx, id)
                .await?
                .ok_or_else(|| user_not_found(id))
        }
        .await;
        let user = tx.finish(result).await?;

        info!(user_id = id, "Updated user");
        Ok(user)
    }

    /// Delete a user together with the bookmarks it owns and their tag associations.
    /// Tags themselves are kept.
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let mut tx = WriteTx::begin(&self.pool).await?;

        let result: Result<u64, AppError> = async {
            if fetch_user(&mut tx, id).await?.is_none() {
                return Err(user_not_found(id));
            }

            sqlx::query(
                r#"
                DELETE FROM bookmark_tags
                WHERE bookmark_id IN (SELECT id FROM bookmarks WHERE user_id = ?)
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;

            let removed_bookmarks = sqlx::query("DELETE FROM bookmarks WHERE user_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            Ok::<_, AppError>(removed_bookmarks)
        }
        .await;
        let removed_bookmarks = tx.finish(result).await?;

        info!(user_id = id, removed_bookmarks, "Deleted user");
        Ok(())
    }
}
