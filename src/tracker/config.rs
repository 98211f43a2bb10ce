use serde::{Deserialize, Serialize};

use crate::tracker::error::TrackingError;
use crate::tracker::position::MovementDirection;

/// Filtering and segmentation thresholds for a tracking session.
///
/// The defaults are engineering values for barbell lifts filmed at
/// 30-60 fps and have not been tuned against field data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Samples below this detector confidence are dropped
    pub min_confidence: f32,
    /// Number of samples in the recency-weighted smoothing window
    pub smoothing_window: usize,
    /// Trailing window for the mean velocity used in phase decisions (ms)
    pub velocity_window_ms: u64,
    /// Speed separating "moving" from "still" (m/s)
    pub velocity_threshold: f64,
    /// Shortest eccentric-to-top duration accepted as a rep (ms)
    pub min_rep_duration_ms: u64,
    /// Longest gap between accepted samples before smoothing restarts (ms)
    pub max_gap_ms: u64,
    /// Consecutive low-confidence drops that mark the signal as lost
    pub signal_lost_after: u32,
    /// Time without samples after which a session finalizes itself (ms)
    pub idle_timeout_ms: u64,
    /// Concentric direction in the image
    pub direction: MovementDirection,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            smoothing_window: 5,
            velocity_window_ms: 200,
            velocity_threshold: 0.05,
            min_rep_duration_ms: 400,
            max_gap_ms: 250,
            signal_lost_after: 3,
            idle_timeout_ms: 10_000,
            direction: MovementDirection::Up,
        }
    }
}

impl TrackerConfig {
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_smoothing_window(mut self, smoothing_window: usize) -> Self {
        self.smoothing_window = smoothing_window;
        self
    }

    pub fn with_velocity_threshold(mut self, velocity_threshold: f64) -> Self {
        self.velocity_threshold = velocity_threshold;
        self
    }

    pub fn with_min_rep_duration_ms(mut self, min_rep_duration_ms: u64) -> Self {
        self.min_rep_duration_ms = min_rep_duration_ms;
        self
    }

    pub fn with_max_gap_ms(mut self, max_gap_ms: u64) -> Self {
        self.max_gap_ms = max_gap_ms;
        self
    }

    pub fn with_direction(mut self, direction: MovementDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Reject configurations the engine cannot operate with.
    pub fn validate(&self) -> Result<(), TrackingError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(invalid("min_confidence", "must be within 0..=1"));
        }
        if self.smoothing_window == 0 {
            return Err(invalid("smoothing_window", "must be positive"));
        }
        if self.velocity_window_ms == 0 {
            return Err(invalid("velocity_window_ms", "must be positive"));
        }
        if !(self.velocity_threshold.is_finite() && self.velocity_threshold > 0.0) {
            return Err(invalid("velocity_threshold", "must be positive"));
        }
        if self.min_rep_duration_ms == 0 {
            return Err(invalid("min_rep_duration_ms", "must be positive"));
        }
        if self.max_gap_ms == 0 {
            return Err(invalid("max_gap_ms", "must be positive"));
        }
        if self.signal_lost_after == 0 {
            return Err(invalid("signal_lost_after", "must be positive"));
        }
        if self.idle_timeout_ms == 0 {
            return Err(invalid("idle_timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> TrackingError {
    TrackingError::InvalidConfig { field, reason }
}
