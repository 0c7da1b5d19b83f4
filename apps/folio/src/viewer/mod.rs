//! Continuous document viewer
//!
//! Renders every page of a document into one scrollable container, derives
//! the active page from the scroll position, keeps the minimap in sync and
//! restores/persists the reader's position.
//!
//! # Concurrency
//!
//! All mutable state sits behind one `parking_lot::Mutex` that is never held
//! across an `.await`, so scroll and click events stay serviceable while a
//! render is suspended on the engine. Each render takes a new container
//! generation; a render whose generation is no longer current stops at its
//! next suspension point and reports [`RenderOutcome::Superseded`].
//!
//! The active page has one write path, `ViewerCore::set_active_page`, which
//! is reached from navigation and scroll detection only.

mod error;
mod events;
mod minimap;
mod session;
mod state;
mod surface;
pub mod tracker;

pub use error::{ViewerError, ViewerResult};
pub use events::{EventBus, ScrollBehavior, ViewerEvent, ViewerSubscription};
pub use minimap::{IndicatorId, MiniMap, MiniMapEntry};
pub use session::{DocumentSession, ScaleBounds};
pub use state::{ViewerSnapshot, ViewerState};
pub use surface::{PageSurface, SurfaceContainer, SurfaceLayout};
pub use tracker::ScrollTracker;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::ViewerConfig;
use crate::document::{
    BookMetadata, Canvas, EngineError, EngineResult, PageViewport, PagedDocument, RenderEngine,
};
use crate::progress::{ProgressError, ProgressSync};

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Container scrolled to the page
    Moved { page: u32, scroll_top: f64 },
    /// Page number outside `1..=page_count`; nothing happened
    OutOfRange,
    /// Target surface does not exist yet; nothing happened
    NotRendered,
}

/// Result of a minimap click; the click is always consumed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorClick {
    Navigated(NavigationOutcome),
    /// Handle from an earlier minimap epoch
    Stale,
}

/// Summary of a completed render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub generation: u64,
    pub page_count: u32,
    pub scale: f32,
    /// Pages left as unpainted placeholders
    pub failed_pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Completed(RenderReport),
    /// A newer render, open or close replaced this one
    Superseded,
}

/// Summary of [`Viewer::open`]
#[derive(Debug, Clone, PartialEq)]
pub struct OpenReport {
    pub book_id: String,
    pub page_count: u32,
    pub current_page: u32,
    /// Page offered by the resume affordance
    pub resume_page: Option<u32>,
    /// Progress fetch failure, reported but not fatal
    pub progress_warning: Option<String>,
    pub render: RenderOutcome,
}

/// Continuous document viewer
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Viewer {
    inner: Arc<ViewerInner>,
}

struct ViewerInner {
    engine: Arc<dyn RenderEngine>,
    progress: ProgressSync,
    config: ViewerConfig,
    bounds: ScaleBounds,
    tracker: ScrollTracker,
    events: EventBus,
    core: Mutex<ViewerCore>,
}

struct ViewerCore {
    session: Option<DocumentSession>,
    container: SurfaceContainer,
    minimap: MiniMap,
    resume_page: Option<u32>,
}

impl ViewerCore {
    /// The single write path for the active page
    fn set_active_page(&mut self, page: u32, events: &EventBus) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let changed = session.state_mut().set_current_page(page);
        let current = session.state().current_page();
        self.minimap.refresh_active(current);

        if changed {
            events.publish(ViewerEvent::ActivePageChanged { page: current });
        }
        changed
    }

    /// Scroll to `page` and make it active
    fn navigate(&mut self, page: u32, behavior: ScrollBehavior, events: &EventBus) -> NavigationOutcome {
        let Some(session) = self.session.as_ref() else {
            return NavigationOutcome::NotRendered;
        };
        if page == 0 || page > session.page_count() {
            tracing::debug!(page, page_count = session.page_count(), "Navigation out of range");
            return NavigationOutcome::OutOfRange;
        }
        let Some(surface) = self.container.surface(page) else {
            tracing::debug!(page, "Navigation target not rendered yet");
            return NavigationOutcome::NotRendered;
        };

        let scroll_top = surface.vertical_offset();
        self.container.set_scroll_top(scroll_top);
        events.publish(ViewerEvent::ScrollRequested {
            scroll_top,
            behavior,
        });
        self.set_active_page(page, events);

        NavigationOutcome::Moved { page, scroll_top }
    }

    fn reset(&mut self) -> u64 {
        self.session = None;
        self.resume_page = None;
        self.minimap.clear();
        self.container.begin_generation()
    }
}

impl Viewer {
    pub fn new(config: ViewerConfig, engine: Arc<dyn RenderEngine>, progress: ProgressSync) -> Self {
        let bounds = ScaleBounds::from_config(&config);
        let container = SurfaceContainer::new(config.page_gap, config.viewport_height);

        Self {
            inner: Arc::new(ViewerInner {
                engine,
                progress,
                bounds,
                tracker: ScrollTracker::new(config.detection),
                events: EventBus::new(config.event_capacity),
                core: Mutex::new(ViewerCore {
                    session: None,
                    container,
                    minimap: MiniMap::new(),
                    resume_page: None,
                }),
                config,
            }),
        }
    }

    /// Open a document and render all of its pages
    ///
    /// Any previous document is discarded first, so a failed open leaves
    /// the viewer empty. The engine open and the progress fetch run
    /// concurrently; a failed or timed-out fetch is reported in
    /// [`OpenReport::progress_warning`].
    pub async fn open(&self, book: &BookMetadata) -> ViewerResult<OpenReport> {
        let generation = self.inner.core.lock().reset();
        tracing::info!(book_id = %book.id, title = %book.title, generation, "Opening document");

        let (document, progress) =
            futures::future::join(self.open_document(book), self.fetch_last_page(&book.id)).await;

        let document = match document {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(book_id = %book.id, error = %e, "Failed to open document");
                return Err(ViewerError::DocumentLoad(e));
            }
        };

        let (last_page, progress_warning) = match progress {
            Ok(last_page) => (last_page, None),
            Err(e) => {
                tracing::warn!(book_id = %book.id, error = %e, "Failed to fetch reading progress");
                (None, Some(e.to_string()))
            }
        };

        let page_count = document.page_count();
        let initial_page = last_page.unwrap_or(1).clamp(1, page_count);
        let resume_page = last_page
            .map(|page| page.min(page_count))
            .filter(|page| *page > 1);

        {
            let mut core = self.inner.core.lock();
            if !core.container.is_current(generation) {
                return Err(ViewerError::Superseded);
            }
            let scale = self.inner.bounds.clamp(self.inner.config.default_scale);
            core.session = Some(DocumentSession::new(book.clone(), document, scale, initial_page));
            core.minimap.rebuild(page_count);
            core.minimap.refresh_active(initial_page);
            core.resume_page = resume_page;
        }

        self.inner.events.publish(ViewerEvent::DocumentOpened {
            book_id: book.id.clone(),
            page_count,
            current_page: initial_page,
        });
        if let Some(page) = resume_page {
            self.inner.events.publish(ViewerEvent::ResumeAvailable { page });
        }
        tracing::info!(book_id = %book.id, page_count, initial_page, ?resume_page, "Document opened");

        let render = match self.render_all().await {
            Ok(render) => render,
            Err(ViewerError::NoDocument) => return Err(ViewerError::Superseded),
            Err(e) => return Err(e),
        };

        let current_page = match render {
            RenderOutcome::Completed(_) => self.current_page().unwrap_or(initial_page),
            RenderOutcome::Superseded => initial_page,
        };

        Ok(OpenReport {
            book_id: book.id.clone(),
            page_count,
            current_page,
            resume_page,
            progress_warning,
            render,
        })
    }

    async fn open_document(&self, book: &BookMetadata) -> EngineResult<Arc<dyn PagedDocument>> {
        let locator = book.locator()?;
        locator.validate()?;

        let secs = self.inner.config.open_timeout_secs;
        let document = tokio::time::timeout(
            Duration::from_secs(secs),
            self.inner.engine.open_document(&locator),
        )
        .await
        .map_err(|_| EngineError::Timeout(secs))??;

        if document.page_count() == 0 {
            return Err(EngineError::Load("document has no pages".to_string()));
        }
        Ok(document)
    }

    async fn fetch_last_page(&self, book_id: &str) -> Result<Option<u32>, ProgressError> {
        let secs = self.inner.config.progress_timeout_secs;
        tokio::time::timeout(
            Duration::from_secs(secs),
            self.inner.progress.fetch_last_page(book_id),
        )
        .await
        .map_err(|_| ProgressError::Timeout(secs))?
    }

    /// Re-create every page surface at the current scale
    ///
    /// Pages are laid out and painted strictly in order. Afterwards the
    /// page that was active when the render started is scrolled back into
    /// place.
    pub async fn render_all(&self) -> ViewerResult<RenderOutcome> {
        let (generation, document, scale, restore_page) = {
            let mut core = self.inner.core.lock();
            let Some(session) = core.session.as_ref() else {
                return Err(ViewerError::NoDocument);
            };
            let document = session.document();
            let scale = session.state().scale();
            let restore_page = session.state().current_page();
            (core.container.begin_generation(), document, scale, restore_page)
        };

        let page_count = document.page_count();
        let secs = self.inner.config.paint_timeout_secs;
        let paint_timeout = Duration::from_secs(secs);
        let mut failed_pages = Vec::new();
        let mut previous: Option<PageViewport> = None;

        tracing::debug!(generation, page_count, scale, "Rendering all pages");

        for page in 1..=page_count {
            if !self.is_current(generation) {
                return Ok(Self::superseded(generation, page));
            }

            let viewport = match tokio::time::timeout(paint_timeout, document.page_viewport(page, scale)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout(secs)),
            };

            let (viewport, failure) = match viewport {
                Ok(viewport) => (viewport.sanitized(), None),
                Err(e) => {
                    let fallback = previous.unwrap_or_else(|| PageViewport::fallback(scale));
                    (fallback, Some(e))
                }
            };
            previous = Some(viewport);

            if !self.push_placeholder(generation, page, viewport) {
                return Ok(Self::superseded(generation, page));
            }

            let failure = match failure {
                Some(e) => Some(e),
                None => {
                    let mut canvas = Canvas::new(viewport);
                    let painted = match tokio::time::timeout(
                        paint_timeout,
                        document.paint_page(page, scale, &mut canvas),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(EngineError::Timeout(secs)),
                    };

                    match painted {
                        Ok(()) => {
                            if !self.install_canvas(generation, page, canvas) {
                                return Ok(Self::superseded(generation, page));
                            }
                            None
                        }
                        Err(e) => Some(e),
                    }
                }
            };

            if let Some(e) = failure {
                if !self.is_current(generation) {
                    return Ok(Self::superseded(generation, page));
                }
                tracing::warn!(generation, page, error = %e, "Page render failed, keeping placeholder");
                self.inner.events.publish(ViewerEvent::PageRenderFailed {
                    generation,
                    page,
                    reason: e.to_string(),
                });
                failed_pages.push(page);
            }
        }

        {
            let mut core = self.inner.core.lock();
            if !core.container.is_current(generation) {
                return Ok(Self::superseded(generation, page_count));
            }
            core.navigate(restore_page, ScrollBehavior::Instant, &self.inner.events);
        }

        self.inner.events.publish(ViewerEvent::LayoutCommitted {
            generation,
            scale,
            page_count,
            failed_pages: failed_pages.clone(),
        });
        tracing::info!(
            generation,
            page_count,
            scale,
            failed = failed_pages.len(),
            "Render complete"
        );

        Ok(RenderOutcome::Completed(RenderReport {
            generation,
            page_count,
            scale,
            failed_pages,
        }))
    }

    fn superseded(generation: u64, page: u32) -> RenderOutcome {
        tracing::debug!(generation, page, "Render superseded");
        RenderOutcome::Superseded
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.core.lock().container.is_current(generation)
    }

    fn push_placeholder(&self, generation: u64, page: u32, viewport: PageViewport) -> bool {
        self.inner
            .core
            .lock()
            .container
            .push_placeholder(generation, page, viewport)
    }

    fn install_canvas(&self, generation: u64, page: u32, canvas: Canvas) -> bool {
        self.inner
            .core
            .lock()
            .container
            .install_canvas(generation, page, canvas)
    }

    /// Clamp and apply a new scale, then re-render
    pub async fn set_scale(&self, scale: f32) -> ViewerResult<RenderOutcome> {
        {
            let mut core = self.inner.core.lock();
            let session = core.session.as_mut().ok_or(ViewerError::NoDocument)?;
            let applied = session.set_scale(scale, &self.inner.bounds);
            tracing::debug!(requested = scale, applied, "Scale changed");
        }
        self.render_all().await
    }

    pub async fn zoom_in(&self) -> ViewerResult<RenderOutcome> {
        let scale = self.scale().ok_or(ViewerError::NoDocument)?;
        self.set_scale(scale + self.inner.bounds.step).await
    }

    pub async fn zoom_out(&self) -> ViewerResult<RenderOutcome> {
        let scale = self.scale().ok_or(ViewerError::NoDocument)?;
        self.set_scale(scale - self.inner.bounds.step).await
    }

    /// Record the container's scroll offset and re-derive the active page
    ///
    /// Returns the new active page when it changed.
    pub fn on_scroll(&self, scroll_top: f64) -> Option<u32> {
        let mut core = self.inner.core.lock();
        core.container.set_scroll_top(scroll_top);
        if core.session.is_none() {
            return None;
        }

        let detected = self.inner.tracker.detect(
            core.container.surfaces(),
            core.container.scroll_top(),
            core.container.viewport_height(),
        )?;

        core.set_active_page(detected, &self.inner.events)
            .then_some(detected)
    }

    /// Height of the container's visible area
    pub fn set_viewport_height(&self, height: f64) {
        self.inner.core.lock().container.set_viewport_height(height);
    }

    /// Scroll to `page`; out-of-range and unrendered targets are ignored
    pub fn go_to_page(&self, page: u32, behavior: ScrollBehavior) -> NavigationOutcome {
        self.inner
            .core
            .lock()
            .navigate(page, behavior, &self.inner.events)
    }

    /// Handle a minimap click
    pub fn click_indicator(&self, id: IndicatorId) -> IndicatorClick {
        let mut core = self.inner.core.lock();
        match core.minimap.resolve(id) {
            Some(page) => IndicatorClick::Navigated(core.navigate(
                page,
                ScrollBehavior::Smooth,
                &self.inner.events,
            )),
            None => {
                tracing::debug!(epoch = id.epoch(), page = id.page(), "Ignoring stale minimap handle");
                IndicatorClick::Stale
            }
        }
    }

    /// Page offered by the resume affordance, if still pending
    pub fn resume_available(&self) -> Option<u32> {
        self.inner.core.lock().resume_page
    }

    /// Jump to the saved page; the affordance is consumed once it succeeds
    pub fn activate_resume(&self) -> Option<NavigationOutcome> {
        let mut core = self.inner.core.lock();
        let page = core.resume_page?;
        let outcome = core.navigate(page, ScrollBehavior::Smooth, &self.inner.events);
        if matches!(outcome, NavigationOutcome::Moved { .. }) {
            core.resume_page = None;
        }
        Some(outcome)
    }

    /// Persist the active page; returns the saved page
    pub async fn save_progress(&self) -> ViewerResult<u32> {
        let (book_id, page) = {
            let core = self.inner.core.lock();
            let session = core.session.as_ref().ok_or(ViewerError::NoDocument)?;
            (session.book().id.clone(), session.state().current_page())
        };

        self.inner.progress.save(&book_id, page).await?;
        Ok(page)
    }

    /// Returns true when the mode changed
    pub fn set_reading_mode(&self, enabled: bool) -> bool {
        let changed = {
            let mut core = self.inner.core.lock();
            match core.session.as_mut() {
                Some(session) => session.state_mut().set_reading_mode(enabled),
                None => false,
            }
        };
        if changed {
            self.inner
                .events
                .publish(ViewerEvent::ReadingModeChanged { enabled });
        }
        changed
    }

    /// Returns the new mode, or `None` without a document
    pub fn toggle_reading_mode(&self) -> Option<bool> {
        let enabled = !self.snapshot()?.reading_mode;
        self.set_reading_mode(enabled);
        Some(enabled)
    }

    pub fn snapshot(&self) -> Option<ViewerSnapshot> {
        let core = self.inner.core.lock();
        let session = core.session.as_ref()?;
        let book = session.book();
        let state = session.state();

        Some(ViewerSnapshot {
            book_id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            page_count: state.page_count(),
            current_page: state.current_page(),
            scale: state.scale(),
            reading_mode: state.reading_mode(),
            resume_page: core.resume_page,
        })
    }

    pub fn current_page(&self) -> Option<u32> {
        let core = self.inner.core.lock();
        core.session.as_ref().map(|s| s.state().current_page())
    }

    pub fn page_count(&self) -> Option<u32> {
        let core = self.inner.core.lock();
        core.session.as_ref().map(DocumentSession::page_count)
    }

    pub fn scale(&self) -> Option<f32> {
        let core = self.inner.core.lock();
        core.session.as_ref().map(|s| s.state().scale())
    }

    pub fn scroll_top(&self) -> f64 {
        self.inner.core.lock().container.scroll_top()
    }

    pub fn minimap(&self) -> Vec<MiniMapEntry> {
        self.inner.core.lock().minimap.entries().to_vec()
    }

    pub fn surfaces(&self) -> Vec<SurfaceLayout> {
        let core = self.inner.core.lock();
        core.container.surfaces().iter().map(PageSurface::layout).collect()
    }

    /// Painted content of `page`, if any
    pub fn surface_canvas(&self, page: u32) -> Option<Canvas> {
        let core = self.inner.core.lock();
        core.container.surface(page)?.canvas().cloned()
    }

    pub fn subscribe(&self) -> ViewerSubscription {
        self.inner.events.subscribe()
    }

    /// Tear down the session
    pub fn close(&self) {
        let generation = self.inner.core.lock().reset();
        self.inner.events.publish(ViewerEvent::Closed);
        tracing::info!(generation, "Viewer closed");
    }
}
