//! Thumbnail navigation strip

use serde::Serialize;

/// Handle of a minimap indicator, valid for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndicatorId {
    epoch: u64,
    page: u32,
}

impl IndicatorId {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// One indicator per page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniMapEntry {
    pub id: IndicatorId,
    pub page_number: u32,
    pub is_active: bool,
}

/// Minimap navigator state
#[derive(Debug, Clone, Default)]
pub struct MiniMap {
    epoch: u64,
    entries: Vec<MiniMapEntry>,
    active: Option<u32>,
}

impl MiniMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all indicators and create `page_count` new ones
    ///
    /// Handles from earlier epochs stop resolving.
    pub fn rebuild(&mut self, page_count: u32) -> u64 {
        self.epoch += 1;
        let epoch = self.epoch;
        self.active = None;
        self.entries = (1..=page_count)
            .map(|page| MiniMapEntry {
                id: IndicatorId { epoch, page },
                page_number: page,
                is_active: false,
            })
            .collect();
        epoch
    }

    /// Remove every indicator
    pub fn clear(&mut self) {
        self.rebuild(0);
    }

    /// Mark exactly `current_page` active
    ///
    /// Returns false when `current_page` is unchanged since the last refresh.
    pub fn refresh_active(&mut self, current_page: u32) -> bool {
        if self.active == Some(current_page) {
            return false;
        }
        for entry in &mut self.entries {
            entry.is_active = entry.page_number == current_page;
        }
        self.active = Some(current_page);
        true
    }

    /// Page targeted by `id`, or `None` for a stale or unknown handle
    pub fn resolve(&self, id: IndicatorId) -> Option<u32> {
        if id.epoch != self.epoch {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.page_number)
    }

    pub fn entries(&self) -> &[MiniMapEntry] {
        &self.entries
    }

    pub fn handle(&self, page: u32) -> Option<IndicatorId> {
        let index = page.checked_sub(1)? as usize;
        self.entries.get(index).map(|entry| entry.id)
    }
}
