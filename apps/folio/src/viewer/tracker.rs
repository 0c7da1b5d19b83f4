//! Active page detection
//!
//! Surface offsets are strictly increasing, so both strategies are binary
//! searches over the laid-out surfaces.

use crate::config::DetectionMode;

use super::surface::PageSurface;

/// Page whose top offset is nearest to `scroll_top`
///
/// The earlier page wins ties. `None` when there are no surfaces.
pub fn nearest_page(surfaces: &[PageSurface], scroll_top: f64) -> Option<u32> {
    if surfaces.is_empty() {
        return None;
    }

    // First surface at or below the scroll offset
    let index = surfaces.partition_point(|s| s.vertical_offset() < scroll_top);

    let best = match (index.checked_sub(1).map(|i| &surfaces[i]), surfaces.get(index)) {
        (Some(above), Some(below)) => {
            let above_distance = (scroll_top - above.vertical_offset()).abs();
            let below_distance = (below.vertical_offset() - scroll_top).abs();
            if below_distance < above_distance {
                below
            } else {
                above
            }
        }
        (Some(above), None) => above,
        (None, Some(below)) => below,
        (None, None) => return None,
    };

    Some(best.page_number())
}

/// Page whose extent contains `point`, if any
pub fn page_containing(surfaces: &[PageSurface], point: f64) -> Option<u32> {
    let index = surfaces.partition_point(|s| s.vertical_offset() <= point);
    let surface = surfaces.get(index.checked_sub(1)?)?;
    (point < surface.bottom()).then(|| surface.page_number())
}

/// Derives the active page from the container's scroll state
#[derive(Debug, Clone, Copy)]
pub struct ScrollTracker {
    mode: DetectionMode,
}

impl ScrollTracker {
    pub fn new(mode: DetectionMode) -> Self {
        Self { mode }
    }

    pub fn detect(&self, surfaces: &[PageSurface], scroll_top: f64, viewport_height: f64) -> Option<u32> {
        match self.mode {
            DetectionMode::ScrollTop => nearest_page(surfaces, scroll_top),
            DetectionMode::ViewportCenter => {
                page_containing(surfaces, scroll_top + viewport_height / 2.0)
                    .or_else(|| nearest_page(surfaces, scroll_top))
            }
        }
    }
}
