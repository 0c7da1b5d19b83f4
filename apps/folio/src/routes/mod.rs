//! Route modules for the Folio progress API

pub mod health;
pub mod progress;

use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the application router
///
/// CORS and tracing layers are added by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/progress", progress::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
