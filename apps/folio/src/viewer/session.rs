//! Document session

use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::document::{BookMetadata, PagedDocument};

use super::state::ViewerState;

/// Zoom bounds and step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ScaleBounds {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let min = config.min_scale.min(config.max_scale);
        let max = config.max_scale.max(config.min_scale);
        Self {
            min,
            max,
            step: config.zoom_step.abs(),
        }
    }

    /// Clamp into `[min, max]`, rounded to two decimals
    pub fn clamp(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return self.min;
        }
        let clamped = scale.clamp(self.min, self.max);
        (clamped * 100.0).round() / 100.0
    }
}

/// Opened document together with its viewer state
pub struct DocumentSession {
    book: BookMetadata,
    document: Arc<dyn PagedDocument>,
    state: ViewerState,
}

impl DocumentSession {
    pub fn new(book: BookMetadata, document: Arc<dyn PagedDocument>, scale: f32, initial_page: u32) -> Self {
        let state = ViewerState::new(document.page_count(), scale, initial_page);
        Self {
            book,
            document,
            state,
        }
    }

    pub fn book(&self) -> &BookMetadata {
        &self.book
    }

    pub fn document(&self) -> Arc<dyn PagedDocument> {
        Arc::clone(&self.document)
    }

    pub fn page_count(&self) -> u32 {
        self.state.page_count()
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut ViewerState {
        &mut self.state
    }

    /// Apply a new scale; re-layout is the caller's job
    pub fn set_scale(&mut self, scale: f32, bounds: &ScaleBounds) -> f32 {
        let applied = bounds.clamp(scale);
        self.state.set_scale(applied);
        applied
    }
}
