//! Page surfaces and the scroll container that lays them out
//!
//! Surfaces are stacked vertically: `offset[1] = 0` and each following page
//! starts `height + page_gap` below the previous one. The container belongs
//! to exactly one render generation at a time and rejects surfaces from any
//! other.

use serde::Serialize;

use crate::document::{Canvas, PageViewport};

/// Drawing target for one page
#[derive(Debug, Clone)]
pub struct PageSurface {
    page_number: u32,
    viewport: PageViewport,
    vertical_offset: f64,
    canvas: Option<Canvas>,
}

impl PageSurface {
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn width(&self) -> u32 {
        self.viewport.width
    }

    pub fn height(&self) -> u32 {
        self.viewport.height
    }

    /// Top position within the scroll container
    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    /// Bottom edge, exclusive
    pub fn bottom(&self) -> f64 {
        self.vertical_offset + f64::from(self.viewport.height)
    }

    /// False for a placeholder whose paint failed or has not finished
    pub fn is_painted(&self) -> bool {
        self.canvas.is_some()
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn layout(&self) -> SurfaceLayout {
        SurfaceLayout {
            page_number: self.page_number,
            width: self.viewport.width,
            height: self.viewport.height,
            vertical_offset: self.vertical_offset,
            painted: self.is_painted(),
        }
    }
}

/// Geometry of a surface, as exposed to the UI shell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceLayout {
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub vertical_offset: f64,
    pub painted: bool,
}

/// Scrollable container holding one surface per page
#[derive(Debug, Clone)]
pub struct SurfaceContainer {
    surfaces: Vec<PageSurface>,
    generation: u64,
    page_gap: f64,
    scroll_top: f64,
    viewport_height: f64,
}

impl SurfaceContainer {
    pub fn new(page_gap: f64, viewport_height: f64) -> Self {
        Self {
            surfaces: Vec::new(),
            generation: 0,
            page_gap: page_gap.max(0.0),
            scroll_top: 0.0,
            viewport_height: viewport_height.max(0.0),
        }
    }

    /// Drop every surface and start a new generation
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.surfaces.clear();
        self.scroll_top = 0.0;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Append an unpainted surface for the next page
    ///
    /// Returns false if `generation` is stale or `page` is not the next one.
    pub fn push_placeholder(&mut self, generation: u64, page: u32, viewport: PageViewport) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        let expected = self.surfaces.len() as u32 + 1;
        if page != expected {
            return false;
        }

        let vertical_offset = self
            .surfaces
            .last()
            .map(|last| last.bottom() + self.page_gap)
            .unwrap_or(0.0);

        self.surfaces.push(PageSurface {
            page_number: page,
            viewport: viewport.sanitized(),
            vertical_offset,
            canvas: None,
        });
        true
    }

    /// Install the painted canvas for `page`
    ///
    /// Returns false if `generation` is stale or the surface does not exist.
    pub fn install_canvas(&mut self, generation: u64, page: u32, canvas: Canvas) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        match self.surface_mut(page) {
            Some(surface) => {
                surface.canvas = Some(canvas);
                true
            }
            None => false,
        }
    }

    pub fn surfaces(&self) -> &[PageSurface] {
        &self.surfaces
    }

    pub fn surface(&self, page: u32) -> Option<&PageSurface> {
        let index = page.checked_sub(1)? as usize;
        self.surfaces.get(index)
    }

    fn surface_mut(&mut self, page: u32) -> Option<&mut PageSurface> {
        let index = page.checked_sub(1)? as usize;
        self.surfaces.get_mut(index)
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Total scrollable height
    pub fn content_height(&self) -> f64 {
        self.surfaces.last().map(PageSurface::bottom).unwrap_or(0.0)
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = if scroll_top.is_finite() {
            scroll_top.max(0.0)
        } else {
            0.0
        };
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        if height.is_finite() {
            self.viewport_height = height.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: u32, height: u32) -> PageViewport {
        PageViewport { width, height }
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let mut container = SurfaceContainer::new(10.0, 800.0);
        let generation = container.begin_generation();

        assert!(container.push_placeholder(generation, 1, viewport(100, 200)));
        assert!(container.push_placeholder(generation, 2, viewport(100, 300)));
        assert!(container.push_placeholder(generation, 3, viewport(100, 0)));
        assert!(container.push_placeholder(generation, 4, viewport(100, 50)));

        let offsets: Vec<f64> = container.surfaces().iter().map(|s| s.vertical_offset()).collect();
        assert_eq!(offsets, vec![0.0, 210.0, 520.0, 531.0]);
        assert_eq!(container.content_height(), 581.0);
    }

    #[test]
    fn test_rejects_stale_generation() {
        let mut container = SurfaceContainer::new(0.0, 800.0);
        let old = container.begin_generation();
        assert!(container.push_placeholder(old, 1, viewport(10, 10)));

        let new = container.begin_generation();
        assert!(container.is_empty());
        assert!(!container.push_placeholder(old, 1, viewport(10, 10)));
        assert!(!container.install_canvas(old, 1, Canvas::new(viewport(10, 10))));
        assert!(container.push_placeholder(new, 1, viewport(10, 10)));
    }

    #[test]
    fn test_pages_must_be_appended_in_order() {
        let mut container = SurfaceContainer::new(0.0, 800.0);
        let generation = container.begin_generation();
        assert!(!container.push_placeholder(generation, 2, viewport(10, 10)));
        assert!(container.push_placeholder(generation, 1, viewport(10, 10)));
        assert!(!container.push_placeholder(generation, 1, viewport(10, 10)));
    }

    #[test]
    fn test_install_canvas_marks_painted() {
        let mut container = SurfaceContainer::new(0.0, 800.0);
        let generation = container.begin_generation();
        container.push_placeholder(generation, 1, viewport(10, 10));

        assert!(!container.surface(1).unwrap().is_painted());
        assert!(container.install_canvas(generation, 1, Canvas::new(viewport(10, 10))));
        assert!(container.surface(1).unwrap().is_painted());
        assert!(!container.install_canvas(generation, 2, Canvas::new(viewport(10, 10))));
        assert!(container.surface(0).is_none());
    }

    #[test]
    fn test_scroll_top_never_negative() {
        let mut container = SurfaceContainer::new(0.0, 800.0);
        container.set_scroll_top(-40.0);
        assert_eq!(container.scroll_top(), 0.0);
        container.set_scroll_top(f64::NAN);
        assert_eq!(container.scroll_top(), 0.0);
    }
}
