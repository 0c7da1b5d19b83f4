//! MuPDF rendering engine
//!
//! MuPDF documents are not thread-safe, so a [`MupdfDocument`] keeps only the
//! document bytes and opens a fresh MuPDF document for every operation inside
//! `spawn_blocking`, serialized by a `parking_lot::Mutex`.

use std::sync::Arc;

use async_trait::async_trait;
use mupdf::{Colorspace, Document, Matrix, Page};
use parking_lot::Mutex;

use super::error::{EngineError, EngineResult};
use super::traits::{PagedDocument, RenderEngine};
use super::types::{Canvas, DocumentLocator, PageViewport};

const PDF_MIME: &str = "application/pdf";

/// Rendering engine backed by MuPDF
#[derive(Clone, Default)]
pub struct MupdfEngine {
    http: reqwest::Client,
}

impl MupdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(&self, url: &str) -> EngineResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Fetch(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RenderEngine for MupdfEngine {
    async fn open_document(&self, locator: &DocumentLocator) -> EngineResult<Arc<dyn PagedDocument>> {
        locator.validate()?;

        let data = match locator {
            DocumentLocator::Path(path) => Arc::new(tokio::fs::read(path).await?),
            DocumentLocator::Url(url) => Arc::new(self.fetch(url).await?),
            DocumentLocator::Bytes(data) => Arc::clone(data),
        };

        if !data.starts_with(b"%PDF") {
            return Err(EngineError::Load("not a PDF document".to_string()));
        }

        let probe = Arc::clone(&data);
        let page_count = tokio::task::spawn_blocking(move || {
            Document::from_bytes(&probe, PDF_MIME)
                .and_then(|doc| doc.page_count())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| EngineError::Load(format!("Task join error: {}", e)))?
        .map_err(EngineError::Load)?;

        let page_count = u32::try_from(page_count).unwrap_or(0);
        tracing::debug!(source = %locator, page_count, "Opened PDF with MuPDF");

        Ok(Arc::new(MupdfDocument {
            data,
            page_count,
            lock: Arc::new(Mutex::new(())),
        }))
    }
}

/// PDF opened by [`MupdfEngine`]
pub struct MupdfDocument {
    data: Arc<Vec<u8>>,
    page_count: u32,
    lock: Arc<Mutex<()>>,
}

impl MupdfDocument {
    /// Run `op` against a freshly loaded page on the blocking pool
    async fn with_page<R, F>(&self, page: u32, op: F) -> EngineResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Page) -> Result<R, mupdf::Error> + Send + 'static,
    {
        if page == 0 || page > self.page_count {
            return Err(EngineError::PageNotFound(page));
        }

        let data = Arc::clone(&self.data);
        let lock = Arc::clone(&self.lock);

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            let run = || -> Result<R, mupdf::Error> {
                let doc = Document::from_bytes(&data, PDF_MIME)?;
                let loaded = doc.load_page((page - 1) as i32)?;
                op(&loaded)
            };
            run().map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| EngineError::Render {
            page,
            reason: format!("Task join error: {}", e),
        })?
        .map_err(|reason| EngineError::Render { page, reason })
    }
}

#[async_trait]
impl PagedDocument for MupdfDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn page_viewport(&self, page: u32, scale: f32) -> EngineResult<PageViewport> {
        let (width, height) = self
            .with_page(page, |loaded| {
                let bounds = loaded.bounds()?;
                Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
            })
            .await?;
        Ok(PageViewport::from_points(width, height, scale))
    }

    async fn paint_page(&self, page: u32, scale: f32, canvas: &mut Canvas) -> EngineResult<()> {
        let (width, height, rgba) = self
            .with_page(page, move |loaded| {
                let matrix = Matrix::new_scale(scale, scale);
                let pixmap = loaded.to_pixmap(&matrix, &Colorspace::device_rgb(), true, true)?;
                Ok(pixmap_to_rgba(&pixmap))
            })
            .await?;

        let bitmap = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            EngineError::Render {
                page,
                reason: "Failed to create image buffer".to_string(),
            }
        })?;
        canvas.draw(&bitmap);
        Ok(())
    }
}

fn pixmap_to_rgba(pixmap: &mupdf::Pixmap) -> (u32, u32, Vec<u8>) {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    (width, height, rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single empty US-Letter page
    fn minimal_pdf() -> Vec<u8> {
        b"%PDF-1.4
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj
2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj
3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> >>
endobj
trailer
<< /Root 1 0 R >>
%%EOF"
            .to_vec()
    }

    #[tokio::test]
    async fn test_opens_and_sizes_pages() {
        let engine = MupdfEngine::new();
        let document = engine
            .open_document(&DocumentLocator::from_bytes(minimal_pdf()))
            .await
            .unwrap();

        assert_eq!(document.page_count(), 1);
        assert_eq!(
            document.page_viewport(1, 1.0).await.unwrap(),
            PageViewport::from_points(612.0, 792.0, 1.0)
        );
        assert!(matches!(
            document.page_viewport(2, 1.0).await,
            Err(EngineError::PageNotFound(2))
        ));

        let mut canvas = Canvas::new(PageViewport::from_points(612.0, 792.0, 0.5));
        document.paint_page(1, 0.5, &mut canvas).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_bytes() {
        let engine = MupdfEngine::new();
        let locator = DocumentLocator::from_bytes(b"PK\x03\x04 not a pdf".to_vec());
        let result = engine.open_document(&locator).await;
        assert!(matches!(result, Err(EngineError::Load(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let engine = MupdfEngine::new();
        let locator = DocumentLocator::parse("/nonexistent/folio/book.pdf").unwrap();
        let result = engine.open_document(&locator).await;
        assert!(matches!(result, Err(EngineError::Io(_))));
    }
}
