//! Builder for creating BarPosition objects from detector outputs.

use crate::tracker::BarPosition;

/// Builder for creating `BarPosition` objects from various detector formats.
///
/// Box formats reduce to the box center, which is where a plate or
/// barbell-end detector places the bar.
#[derive(Debug, Clone, Default)]
pub struct BarPositionBuilder {
    x: f64,
    y: f64,
    confidence: f32,
    timestamp_ms: u64,
}

impl BarPositionBuilder {
    /// Create a new position builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the position from a single keypoint.
    pub fn point(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the position from a box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.x = (x1 + x2) / 2.0;
        self.y = (y1 + y2) / 2.0;
        self
    }

    /// Set the position from a box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f64, cy: f64, _w: f64, _h: f64) -> Self {
        self.x = cx;
        self.y = cy;
        self
    }

    /// Set the position from a box in TLWH format (top, left, width, height).
    pub fn tlwh(mut self, t: f64, l: f64, w: f64, h: f64) -> Self {
        self.x = l + w / 2.0;
        self.y = t + h / 2.0;
        self
    }

    /// Set the detector confidence.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the capture timestamp in milliseconds.
    pub fn timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Build the final `BarPosition`.
    pub fn build(self) -> BarPosition {
        BarPosition::new(self.x, self.y, self.confidence, self.timestamp_ms)
    }
}
