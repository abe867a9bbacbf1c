//! Execution state repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::db::Database;
use super::store::StateStore;
use crate::{AppError, BoxFuture, Result};

/// [`StateStore`] backed by the `session_state` table.
#[derive(Clone)]
pub struct SqliteStateStore {
    db: Arc<Database>,
}

impl SqliteStateStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Session ids with a stored state, oldest update first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_session_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT session_id FROM session_state ORDER BY updated_at ASC")
                .fetch_all(self.db.as_ref())
                .await?;
        Ok(ids)
    }

    /// Delete states last updated before `before`.
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge(&self, before: DateTime<Utc>) -> Result<u64> {
        let before_str = before.to_rfc3339();
        let result = sqlx::query("DELETE FROM session_state WHERE updated_at < ?1")
            .bind(&before_str)
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }

    async fn upsert(&self, session_id: &str, blob: &[u8]) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO session_state (session_id, state, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
        )
        .bind(session_id)
        .bind(blob)
        .bind(&updated_at)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    async fn fetch(&self, session_id: &str) -> Result<Vec<u8>> {
        let blob: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT state FROM session_state WHERE session_id = ?1")
                .bind(session_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        blob.ok_or_else(|| AppError::NotFound(format!("no state stored for session '{session_id}'")))
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_state WHERE session_id = ?1")
            .bind(session_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn save(&self, session_id: &str, blob: Vec<u8>) -> BoxFuture<'_, ()> {
        let session_id = session_id.to_owned();
        Box::pin(async move { self.upsert(&session_id, &blob).await })
    }

    fn restore(&self, session_id: &str) -> BoxFuture<'_, Vec<u8>> {
        let session_id = session_id.to_owned();
        Box::pin(async move { self.fetch(&session_id).await })
    }

    fn delete(&self, session_id: &str) -> BoxFuture<'_, ()> {
        let session_id = session_id.to_owned();
        Box::pin(async move { self.remove(&session_id).await })
    }
}
