use ratatui::layout::{Position, Rect};

use super::focus::Focus;

/// Screen bounds of each focus zone, recorded while drawing a frame.
#[derive(Debug, Default, Clone)]
pub struct ZoneRegions {
    regions: Vec<(Focus, Rect)>,
}

impl ZoneRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn register(&mut self, zone: Focus, bounds: Rect) {
        self.regions.push((zone, bounds));
    }

    pub fn bounds(&self, zone: Focus) -> Option<Rect> {
        self.regions
            .iter()
            .rev()
            .find(|(z, _)| *z == zone)
            .map(|(_, r)| *r)
    }

    /// Zone under the given cell. Later registrations win, so overlays
    /// registered last take priority.
    pub fn zone_at(&self, column: u16, row: u16) -> Option<Focus> {
        let pos = Position { x: column, y: row };
        self.regions
            .iter()
            .rev()
            .find(|(_, bounds)| bounds.contains(pos))
            .map(|(zone, _)| *zone)
    }
}
