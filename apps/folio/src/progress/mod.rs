//! Reading progress persistence
//!
//! The viewer reads the last saved page when a document is opened and writes
//! the active page back on explicit save. Storage sits behind
//! [`ProgressStore`]; the crate ships an in-memory store, a SQLite store
//! (`db::SqliteProgressStore`) and an HTTP client for the progress API.

mod http;
mod memory;

pub use http::HttpProgressClient;
pub use memory::MemoryProgressStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::ReaderIdentity;

/// Recoverable progress I/O error
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Identity is not a reader (admin or anonymous)
    #[error("Progress tracking unavailable for this identity")]
    NotTracked,

    #[error("Invalid progress: {0}")]
    Invalid(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Progress API answered with an error status
    #[error("Progress service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Progress backend error: {0}")]
    Backend(String),

    #[error("Progress request timed out after {0}s")]
    Timeout(u64),
}

/// Persistence collaborator for reading progress
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Last saved page for `(reader, book_id)`; `None` when nothing was saved
    async fn get_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
    ) -> Result<Option<u32>, ProgressError>;

    /// Keyed upsert of `(reader, book_id) -> last_page`
    async fn save_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
        last_page: u32,
    ) -> Result<(), ProgressError>;
}

/// Validate a save request before it reaches a store
pub fn validate_save(book_id: &str, last_page: u32) -> Result<(), ProgressError> {
    if book_id.trim().is_empty() {
        return Err(ProgressError::Invalid("bookId is required".to_string()));
    }
    if last_page == 0 {
        return Err(ProgressError::Invalid("lastPage must be at least 1".to_string()));
    }
    Ok(())
}

/// Progress synchronizer bound to the viewer's identity
///
/// Only readers are tracked: for anyone else fetches are skipped and saves
/// are rejected with [`ProgressError::NotTracked`].
#[derive(Clone)]
pub struct ProgressSync {
    store: Arc<dyn ProgressStore>,
    identity: Option<ReaderIdentity>,
}

impl ProgressSync {
    pub fn new(store: Arc<dyn ProgressStore>, identity: Option<ReaderIdentity>) -> Self {
        Self { store, identity }
    }

    fn tracked_identity(&self) -> Option<&ReaderIdentity> {
        self.identity.as_ref().filter(|identity| identity.tracks_progress())
    }

    /// Fetch the saved page for `book_id`
    ///
    /// `Ok(None)` means the fetch was skipped for an untracked identity.
    /// Absent progress reads as page 1.
    pub async fn fetch_last_page(&self, book_id: &str) -> Result<Option<u32>, ProgressError> {
        let Some(reader) = self.tracked_identity() else {
            tracing::debug!(book_id, "Progress fetch skipped for untracked identity");
            return Ok(None);
        };

        let last_page = self
            .store
            .get_progress(reader, book_id)
            .await?
            .unwrap_or(1)
            .max(1);

        tracing::debug!(book_id, user_id = %reader.user_id, last_page, "Fetched reading progress");
        Ok(Some(last_page))
    }

    /// Persist `last_page` for `book_id`
    pub async fn save(&self, book_id: &str, last_page: u32) -> Result<(), ProgressError> {
        let reader = self.tracked_identity().ok_or(ProgressError::NotTracked)?;
        validate_save(book_id, last_page)?;

        self.store.save_progress(reader, book_id, last_page).await?;
        tracing::info!(book_id, user_id = %reader.user_id, last_page, "Saved reading progress");
        Ok(())
    }
}
