//! Rendering engine traits
//!
//! The viewer never rasterizes pages itself. It talks to an opaque engine
//! that can open a document, size a page at a scale and paint it onto a
//! [`Canvas`].

use std::sync::Arc;

use async_trait::async_trait;

use super::error::EngineResult;
use super::types::{Canvas, DocumentLocator, PageViewport};

/// Document rendering engine
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Open the document behind `locator`
    ///
    /// Fails with `EngineError::InvalidLocator`, `Fetch` or `Load`.
    async fn open_document(&self, locator: &DocumentLocator) -> EngineResult<Arc<dyn PagedDocument>>;
}

/// Opened paginated document
///
/// Page numbers are 1-based.
#[async_trait]
pub trait PagedDocument: Send + Sync {
    /// Number of pages, fixed once opened
    fn page_count(&self) -> u32;

    /// Page dimensions in device pixels at `scale`
    async fn page_viewport(&self, page: u32, scale: f32) -> EngineResult<PageViewport>;

    /// Paint the page onto `canvas`
    async fn paint_page(&self, page: u32, scale: f32, canvas: &mut Canvas) -> EngineResult<()>;
}
