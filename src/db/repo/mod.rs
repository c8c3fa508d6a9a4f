//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by entity:
//! - `users.rs` - User CRUD and cascading delete
//! - `bookmarks.rs` - Bookmark CRUD and tag-set maintenance
//! - `tags.rs` - Tag CRUD, usage counts, and name resolution
//!
//! Every write runs inside a single `WriteTx`, which holds SQLite's write lock
//! from its first statement so that read-then-write sequences never race.

mod bookmarks;
mod tags;
mod users;

use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use std::ops::{Deref, DerefMut};
use tracing::warn;

use crate::error::AppError;

/// A `BEGIN IMMEDIATE` transaction on a pooled connection.
///
/// Deferred transactions only take a read lock on their first `SELECT` and
/// fail with `SQLITE_BUSY` when they later try to write under contention;
/// `IMMEDIATE` takes the write lock up front and waits on `busy_timeout`.
/// Finish with [`WriteTx::finish`]. A guard dropped unfinished (panic or
/// cancellation) detaches its connection from the pool, and closing it rolls
/// back the open transaction.
pub(crate) struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    pub(crate) async fn begin(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(WriteTx { conn: Some(conn) })
    }

    /// Commit when `result` is `Ok`, roll back otherwise, and pass `result` through.
    pub(crate) async fn finish<T>(mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        let statement = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        sqlx::query(statement).execute(&mut *self).await?;
        // Back to the pool only once the transaction is closed.
        self.conn.take();
        result
    }
}

impl Deref for WriteTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        self.conn
            .as_deref()
            .expect("WriteTx used after finish")
    }
}

impl DerefMut for WriteTx {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        self.conn
            .as_deref_mut()
            .expect("WriteTx used after finish")
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("Write transaction dropped before finishing; closing its connection");
            drop(conn.detach());
        }
    }
}

/// Row counts per entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub users: i64,
    pub bookmarks: i64,
    pub tags: i64,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn counts(&self) -> Result<EntityCounts, sqlx::Error> {
        let (users, bookmarks, tags): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM bookmarks),
                (SELECT COUNT(*) FROM tags)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(EntityCounts {
            users,
            bookmarks,
            tags,
        })
    }
}
