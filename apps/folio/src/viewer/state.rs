//! Viewer state

use serde::Serialize;

/// Single source of truth for one viewing session
///
/// `1 <= current_page <= page_count` holds after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    current_page: u32,
    page_count: u32,
    scale: f32,
    reading_mode: bool,
}

impl ViewerState {
    /// `page_count` must be positive; `initial_page` is clamped into range
    pub fn new(page_count: u32, scale: f32, initial_page: u32) -> Self {
        let page_count = page_count.max(1);
        Self {
            current_page: initial_page.clamp(1, page_count),
            page_count,
            scale,
            reading_mode: false,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn reading_mode(&self) -> bool {
        self.reading_mode
    }

    /// Returns true when the page changed
    pub(crate) fn set_current_page(&mut self, page: u32) -> bool {
        let page = page.clamp(1, self.page_count);
        if page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub(crate) fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Returns true when the mode changed
    pub(crate) fn set_reading_mode(&mut self, enabled: bool) -> bool {
        let changed = self.reading_mode != enabled;
        self.reading_mode = enabled;
        changed
    }
}

/// Read-only view of the session for the UI shell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub page_count: u32,
    pub current_page: u32,
    pub scale: f32,
    pub reading_mode: bool,
    /// Page offered by the resume affordance, if still pending
    pub resume_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_page_clamped() {
        assert_eq!(ViewerState::new(10, 1.4, 0).current_page(), 1);
        assert_eq!(ViewerState::new(10, 1.4, 25).current_page(), 10);
        assert_eq!(ViewerState::new(10, 1.4, 4).current_page(), 4);
    }

    #[test]
    fn test_set_current_page_stays_in_range() {
        let mut state = ViewerState::new(5, 1.4, 1);
        assert!(state.set_current_page(9));
        assert_eq!(state.current_page(), 5);
        assert!(!state.set_current_page(5));
        assert!(state.set_current_page(0));
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn test_reading_mode_toggle() {
        let mut state = ViewerState::new(3, 1.0, 1);
        assert!(state.set_reading_mode(true));
        assert!(!state.set_reading_mode(true));
        assert!(state.reading_mode());
    }
}
