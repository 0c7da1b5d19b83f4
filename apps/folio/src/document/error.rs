//! Rendering engine error types

use thiserror::Error;

/// Error reported by a rendering engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Locator is empty or malformed
    #[error("Invalid document locator: {0}")]
    InvalidLocator(String),

    /// Resource could not be parsed as a document
    #[error("Failed to load document: {0}")]
    Load(String),

    /// Resource could not be fetched
    #[error("Failed to fetch document: {0}")]
    Fetch(String),

    /// Page number outside the document
    #[error("Page not found: {0}")]
    PageNotFound(u32),

    /// Page-scoped paint failure
    #[error("Failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// Engine did not answer in time
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;
