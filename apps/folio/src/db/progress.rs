//! Reading progress database operations

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::ReaderIdentity;
use crate::error::Result;
use crate::progress::{ProgressError, ProgressStore};

/// Reading progress record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReadingProgress {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub last_page: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Progress repository
pub struct ProgressRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProgressRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get progress for a specific book
    pub async fn get(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        let progress = sqlx::query_as::<_, ReadingProgress>(
            r#"
            SELECT id, user_id, book_id, last_page, created_at, updated_at
            FROM reading_progress
            WHERE user_id = ? AND book_id = ?
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(progress)
    }

    /// Get all progress for a user, most recent first
    pub async fn list(&self, user_id: &str) -> Result<Vec<ReadingProgress>> {
        let progress = sqlx::query_as::<_, ReadingProgress>(
            r#"
            SELECT id, user_id, book_id, last_page, created_at, updated_at
            FROM reading_progress
            WHERE user_id = ?
            ORDER BY updated_at DESC, book_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(progress)
    }

    /// Update or create progress for a book
    ///
    /// Saving the page already stored leaves the row untouched.
    pub async fn upsert(&self, user_id: &str, book_id: &str, last_page: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO reading_progress (id, user_id, book_id, last_page, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, book_id) DO UPDATE SET
                last_page = excluded.last_page,
                updated_at = excluded.updated_at
            WHERE reading_progress.last_page != excluded.last_page
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(book_id)
        .bind(last_page)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        tracing::debug!(user_id, book_id, last_page, "Upserted reading progress");
        Ok(())
    }
}

/// [`ProgressStore`] over the local SQLite database
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn get_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
    ) -> std::result::Result<Option<u32>, ProgressError> {
        let record = ProgressRepository::new(&self.pool)
            .get(&reader.user_id, book_id)
            .await
            .map_err(|e| ProgressError::Backend(e.to_string()))?;

        Ok(record.map(|r| u32::try_from(r.last_page).unwrap_or(1).max(1)))
    }

    async fn save_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
        last_page: u32,
    ) -> std::result::Result<(), ProgressError> {
        ProgressRepository::new(&self.pool)
            .upsert(&reader.user_id, book_id, i64::from(last_page))
            .await
            .map_err(|e| ProgressError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;

    async fn memory_pool() -> SqlitePool {
        create_pool("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_absent() {
        let pool = memory_pool().await;
        let repo = ProgressRepository::new(&pool);
        assert!(repo.get("u1", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let pool = memory_pool().await;
        let repo = ProgressRepository::new(&pool);

        repo.upsert("u1", "1", 4).await.unwrap();
        let once = repo.get("u1", "1").await.unwrap().unwrap();

        repo.upsert("u1", "1", 4).await.unwrap();
        let twice = repo.get("u1", "1").await.unwrap().unwrap();

        assert_eq!(once.id, twice.id);
        assert_eq!(once.last_page, twice.last_page);
        assert_eq!(once.updated_at, twice.updated_at);
        assert_eq!(repo.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_updates_page() {
        let pool = memory_pool().await;
        let repo = ProgressRepository::new(&pool);

        repo.upsert("u1", "1", 4).await.unwrap();
        repo.upsert("u1", "1", 9).await.unwrap();
        repo.upsert("u2", "1", 2).await.unwrap();

        assert_eq!(repo.get("u1", "1").await.unwrap().unwrap().last_page, 9);
        assert_eq!(repo.get("u2", "1").await.unwrap().unwrap().last_page, 2);
        assert_eq!(repo.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("folio.db").display());
        let reader = ReaderIdentity::reader("u1");

        {
            let store = SqliteProgressStore::new(create_pool(&url).await.unwrap());
            store.save_progress(&reader, "7", 33).await.unwrap();
        }

        let store = SqliteProgressStore::new(create_pool(&url).await.unwrap());
        assert_eq!(store.get_progress(&reader, "7").await.unwrap(), Some(33));
        assert_eq!(store.get_progress(&reader, "8").await.unwrap(), None);
    }
}
