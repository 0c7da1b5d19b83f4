//! Deterministic collaborators for tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::Rgba;
use tokio::sync::Notify;

use crate::auth::ReaderIdentity;
use crate::config::Config;
use crate::db::create_pool;
use crate::document::{
    Canvas, DocumentLocator, EngineError, EngineResult, PageViewport, PagedDocument, RenderEngine,
};
use crate::progress::{ProgressError, ProgressStore};
use crate::routes::build_router;
use crate::state::AppState;

/// Page size in points used unless overridden
const DEFAULT_PAGE: (f32, f32) = (100.0, 200.0);

/// Parks one paint until released
pub struct PaintGate {
    /// Notified when the gated paint starts waiting
    pub entered: Arc<Notify>,
    /// Notify to let the gated paint finish
    pub release: Arc<Notify>,
}

struct Gate {
    page: u32,
    armed: AtomicBool,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[derive(Default)]
struct FakeSpec {
    pages: u32,
    sizes: HashMap<u32, (f32, f32)>,
    fail_paint: HashSet<u32>,
    fail_viewport: HashSet<u32>,
    stall_paint: HashSet<u32>,
    stall_open: bool,
    gate: Option<Gate>,
}

/// In-memory engine; any locator containing "broken" fails to open
pub struct FakeEngine {
    spec: Arc<FakeSpec>,
}

impl FakeEngine {
    pub fn new(pages: u32) -> Self {
        Self {
            spec: Arc::new(FakeSpec {
                pages,
                ..FakeSpec::default()
            }),
        }
    }

    fn configure(mut self, f: impl FnOnce(&mut FakeSpec)) -> Self {
        f(Arc::get_mut(&mut self.spec).expect("fake engine configured after first open"));
        self
    }

    pub fn with_page_size(self, page: u32, width: f32, height: f32) -> Self {
        self.configure(|spec| {
            spec.sizes.insert(page, (width, height));
        })
    }

    pub fn failing_paint(self, page: u32) -> Self {
        self.configure(|spec| {
            spec.fail_paint.insert(page);
        })
    }

    pub fn failing_viewport(self, page: u32) -> Self {
        self.configure(|spec| {
            spec.fail_viewport.insert(page);
        })
    }

    /// Opening never completes
    pub fn stalling_open(self) -> Self {
        self.configure(|spec| spec.stall_open = true)
    }

    /// Painting `page` never completes
    pub fn stalling_paint(self, page: u32) -> Self {
        self.configure(|spec| {
            spec.stall_paint.insert(page);
        })
    }

    /// The first paint of `page` waits until the returned gate is released
    pub fn with_gate(self, page: u32) -> (Self, PaintGate) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gate = Gate {
            page,
            armed: AtomicBool::new(true),
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        };
        let engine = self.configure(|spec| spec.gate = Some(gate));
        (engine, PaintGate { entered, release })
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn open_document(&self, locator: &DocumentLocator) -> EngineResult<Arc<dyn PagedDocument>> {
        if locator.to_string().contains("broken") {
            return Err(EngineError::Load("corrupt cross-reference table".to_string()));
        }
        if self.spec.stall_open {
            std::future::pending::<()>().await;
        }
        Ok(Arc::new(FakeDocument {
            spec: Arc::clone(&self.spec),
        }))
    }
}

struct FakeDocument {
    spec: Arc<FakeSpec>,
}

#[async_trait]
impl PagedDocument for FakeDocument {
    fn page_count(&self) -> u32 {
        self.spec.pages
    }

    async fn page_viewport(&self, page: u32, scale: f32) -> EngineResult<PageViewport> {
        if self.spec.fail_viewport.contains(&page) {
            return Err(EngineError::Render {
                page,
                reason: "missing media box".to_string(),
            });
        }
        let (width, height) = self.spec.sizes.get(&page).copied().unwrap_or(DEFAULT_PAGE);
        Ok(PageViewport::from_points(width, height, scale))
    }

    async fn paint_page(&self, page: u32, _scale: f32, canvas: &mut Canvas) -> EngineResult<()> {
        if let Some(gate) = &self.spec.gate {
            if gate.page == page && gate.armed.swap(false, Ordering::SeqCst) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        if self.spec.stall_paint.contains(&page) {
            std::future::pending::<()>().await;
        }
        if self.spec.fail_paint.contains(&page) {
            return Err(EngineError::Render {
                page,
                reason: "corrupt content stream".to_string(),
            });
        }
        canvas.fill(Rgba([255, 255, 255, 255]));
        Ok(())
    }
}

/// Store whose backend is always down
pub struct FailingProgressStore;

#[async_trait]
impl ProgressStore for FailingProgressStore {
    async fn get_progress(
        &self,
        _reader: &ReaderIdentity,
        _book_id: &str,
    ) -> Result<Option<u32>, ProgressError> {
        Err(ProgressError::Backend("connection refused".to_string()))
    }

    async fn save_progress(
        &self,
        _reader: &ReaderIdentity,
        _book_id: &str,
        _last_page: u32,
    ) -> Result<(), ProgressError> {
        Err(ProgressError::Backend("connection refused".to_string()))
    }
}

/// Store whose backend accepts requests but never answers
pub struct HangingProgressStore;

#[async_trait]
impl ProgressStore for HangingProgressStore {
    async fn get_progress(
        &self,
        _reader: &ReaderIdentity,
        _book_id: &str,
    ) -> Result<Option<u32>, ProgressError> {
        std::future::pending().await
    }

    async fn save_progress(
        &self,
        _reader: &ReaderIdentity,
        _book_id: &str,
        _last_page: u32,
    ) -> Result<(), ProgressError> {
        std::future::pending().await
    }
}

/// Serve the progress API on an ephemeral port; returns the `/api` base URL
pub async fn spawn_api() -> String {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    let app = build_router(AppState::new(Config::default(), pool));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", addr)
}
