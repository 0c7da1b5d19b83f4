//! In-memory progress store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProgressError, ProgressStore};
use crate::auth::ReaderIdentity;

/// Progress store backed by a map keyed on `(user_id, book_id)`
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    entries: RwLock<HashMap<(String, String), u32>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
    ) -> Result<Option<u32>, ProgressError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(reader.user_id.clone(), book_id.to_string()))
            .copied())
    }

    async fn save_progress(
        &self,
        reader: &ReaderIdentity,
        book_id: &str,
        last_page: u32,
    ) -> Result<(), ProgressError> {
        let mut entries = self.entries.write().await;
        entries.insert((reader.user_id.clone(), book_id.to_string()), last_page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyed_per_reader() {
        let store = MemoryProgressStore::new();
        let alice = ReaderIdentity::reader("alice");
        let bob = ReaderIdentity::reader("bob");

        store.save_progress(&alice, "1", 5).await.unwrap();
        store.save_progress(&alice, "1", 5).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get_progress(&alice, "1").await.unwrap(), Some(5));
        assert_eq!(store.get_progress(&bob, "1").await.unwrap(), None);
    }
}
