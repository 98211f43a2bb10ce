//! Numerical differentiation of the filtered bar position.

use std::collections::VecDeque;

use nalgebra::{Point2, Vector2};

use crate::tracker::calibration::CameraCalibration;
use crate::tracker::config::TrackerConfig;
use crate::tracker::error::TrackingError;
use crate::tracker::position::FilteredPosition;

/// Velocity of the bar at one filtered sample, in m/s along the
/// concentric direction (positive = concentric).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityData {
    pub timestamp_ms: u64,
    pub instantaneous_velocity: f64,
    /// Arithmetic mean of instantaneous velocities over the trailing window
    pub mean_velocity_window: f64,
    /// Calibrated bar position in meters, image frame
    pub position_m: Point2<f64>,
    /// Time since the previous velocity sample
    pub interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    meters_per_pixel: f64,
    direction: Vector2<f64>,
    window_ms: u64,
    previous: Option<(Point2<f64>, u64)>,
    history: VecDeque<(u64, f64)>,
}

impl VelocityEstimator {
    pub fn new(
        config: &TrackerConfig,
        calibration: &CameraCalibration,
    ) -> Result<Self, TrackingError> {
        Ok(Self {
            meters_per_pixel: calibration.to_meters(1.0)?,
            direction: config.direction.unit(),
            window_ms: config.velocity_window_ms,
            previous: None,
            history: VecDeque::new(),
        })
    }

    /// Differentiate against the previous filtered sample.
    ///
    /// Returns `None` for the first sample of a segment and for samples
    /// sharing the previous timestamp.
    pub fn update(&mut self, position: &FilteredPosition) -> Option<VelocityData> {
        if position.segment_start {
            self.reset();
        }

        let Some((prev_point, prev_ms)) = self.previous else {
            self.previous = Some((position.point, position.timestamp_ms));
            return None;
        };
        let interval_ms = position.timestamp_ms.saturating_sub(prev_ms);
        if interval_ms == 0 {
            return None;
        }
        self.previous = Some((position.point, position.timestamp_ms));

        let displacement_px = (position.point - prev_point).dot(&self.direction);
        let velocity = displacement_px * self.meters_per_pixel / (interval_ms as f64 / 1000.0);

        self.history.push_back((position.timestamp_ms, velocity));
        while let Some(&(ts, _)) = self.history.front() {
            if position.timestamp_ms - ts > self.window_ms {
                self.history.pop_front();
            } else {
                break;
            }
        }
        let mean = self.history.iter().map(|(_, v)| v).sum::<f64>() / self.history.len() as f64;

        Some(VelocityData {
            timestamp_ms: position.timestamp_ms,
            instantaneous_velocity: velocity,
            mean_velocity_window: mean,
            position_m: Point2::from(position.point.coords * self.meters_per_pixel),
            interval_ms,
        })
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.history.clear();
    }
}
