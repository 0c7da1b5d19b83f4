//! Core document types

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// US Letter page size in points, used when an engine cannot size a page
const FALLBACK_PAGE_POINTS: (f32, f32) = (612.0, 792.0);

/// Where a document comes from
#[derive(Clone)]
pub enum DocumentLocator {
    /// Local file
    Path(PathBuf),
    /// Remote resource (`http://` or `https://`)
    Url(String),
    /// Document already in memory
    Bytes(Arc<Vec<u8>>),
}

impl DocumentLocator {
    /// Parse a catalog file locator (URL or file path)
    pub fn parse(value: &str) -> EngineResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EngineError::InvalidLocator("empty locator".to_string()));
        }

        let lower = value.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Url(value.to_string()));
        }
        if lower.contains("://") {
            return Err(EngineError::InvalidLocator(format!(
                "unsupported scheme: {}",
                value
            )));
        }

        Ok(Self::Path(PathBuf::from(value)))
    }

    /// Create a locator from owned bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::Bytes(Arc::new(data))
    }

    /// Reject locators that can never resolve
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            Self::Path(path) if path.as_os_str().is_empty() => {
                Err(EngineError::InvalidLocator("empty path".to_string()))
            }
            Self::Url(url) if url.trim().is_empty() => {
                Err(EngineError::InvalidLocator("empty url".to_string()))
            }
            Self::Bytes(data) if data.is_empty() => {
                Err(EngineError::InvalidLocator("empty document bytes".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DocumentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
            Self::Bytes(data) => write!(f, "<{} bytes>", data.len()),
        }
    }
}

impl fmt::Debug for DocumentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
        }
    }
}

/// Catalog entry used to open a document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    /// Catalog book id
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    /// File path or URL of the document
    pub file_locator: String,
}

impl BookMetadata {
    pub fn locator(&self) -> EngineResult<DocumentLocator> {
        DocumentLocator::parse(&self.file_locator)
    }
}

/// Page size at a given scale, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewport {
    pub width: u32,
    pub height: u32,
}

impl PageViewport {
    /// Build from unscaled page points
    pub fn from_points(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width: to_pixels(width * scale),
            height: to_pixels(height * scale),
        }
    }

    /// US Letter at `scale`
    pub fn fallback(scale: f32) -> Self {
        Self::from_points(FALLBACK_PAGE_POINTS.0, FALLBACK_PAGE_POINTS.1, scale)
    }

    /// Surfaces are never zero-sized
    pub fn sanitized(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }
}

fn to_pixels(value: f32) -> u32 {
    if !value.is_finite() || value <= 1.0 {
        return 1;
    }
    value.ceil().min(u32::MAX as f32) as u32
}

/// Drawing surface a page is painted onto
///
/// Starts fully transparent; a surface whose paint failed stays that way.
#[derive(Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(viewport: PageViewport) -> Self {
        let viewport = viewport.sanitized();
        Self {
            image: RgbaImage::new(viewport.width, viewport.height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Fill the whole surface with one color
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Copy a rendered bitmap onto the surface, clipped to its bounds
    pub fn draw(&mut self, bitmap: &RgbaImage) {
        image::imageops::replace(&mut self.image, bitmap, 0, 0);
    }

    /// True while nothing has been painted
    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|pixel| pixel.0[3] == 0)
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
