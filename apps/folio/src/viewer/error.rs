//! Viewer error types

use thiserror::Error;

use crate::document::EngineError;
use crate::progress::ProgressError;

/// Error returned by viewer operations
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Document could not be opened; fatal to the session
    #[error("Failed to open document: {0}")]
    DocumentLoad(#[source] EngineError),

    /// Operation needs an open document
    #[error("No document is open")]
    NoDocument,

    /// A newer open or close replaced this operation
    #[error("Superseded by a newer document")]
    Superseded,

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

pub type ViewerResult<T> = std::result::Result<T, ViewerError>;
