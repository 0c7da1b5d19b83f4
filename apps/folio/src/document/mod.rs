//! Document abstraction
//!
//! Types shared by every rendering engine, the engine traits and, behind the
//! `mupdf` feature, a MuPDF-backed engine.

mod error;
mod traits;
mod types;

#[cfg(feature = "mupdf")]
mod mupdf;

pub use error::{EngineError, EngineResult};
pub use traits::{PagedDocument, RenderEngine};
pub use types::{BookMetadata, Canvas, DocumentLocator, PageViewport};

#[cfg(feature = "mupdf")]
pub use self::mupdf::{MupdfDocument, MupdfEngine};
