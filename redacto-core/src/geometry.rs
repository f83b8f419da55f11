//! Region geometry.
//!
//! Detectors produce candidate boxes in whatever form their model emits:
//! `x, y, w, h` integer rectangles from the cascade, floating-point corner
//! boxes from the neural model. Everything is converted to [`Region`] and
//! clipped against the frame before the redactor sees it. A candidate with
//! no area left after clipping is discarded.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Region {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_xywh(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// Rounds a floating-point corner box to the nearest pixel edges.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(
            round_coord(x1),
            round_coord(y1),
            round_coord(x2),
            round_coord(y2),
        )
    }

    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Clips the region to `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the region lies inside the frame.
    pub fn clip(&self, width: u32, height: u32) -> Option<Region> {
        let clipped = Region::new(
            self.x1.clamp(0, width as i64),
            self.y1.clamp(0, height as i64),
            self.x2.clamp(0, width as i64),
            self.y2.clamp(0, height as i64),
        );
        (!clipped.is_empty()).then_some(clipped)
    }
}

fn round_coord(v: f32) -> i64 {
    if v.is_finite() { v.round() as i64 } else { 0 }
}
