//! Application state for the progress API

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::SqliteProgressStore;
use crate::progress::{HttpProgressClient, ProgressStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, db }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Progress store for embedded viewers: the remote API when one is
    /// configured, otherwise the local database
    pub fn progress_store(&self) -> Arc<dyn ProgressStore> {
        match &self.config().progress_api {
            Some(api) => Arc::new(HttpProgressClient::new(api)),
            None => Arc::new(SqliteProgressStore::new(self.inner.db.clone())),
        }
    }
}
