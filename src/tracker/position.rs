use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// One raw bar observation produced by an external detector.
///
/// Coordinates are in the same pixel space the `CameraCalibration` was
/// measured in. Image y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPosition {
    /// Horizontal image coordinate
    pub x: f64,
    /// Vertical image coordinate (grows downward)
    pub y: f64,
    /// Detector confidence in `0..=1`
    pub confidence: f32,
    /// Monotonic capture time in milliseconds
    pub timestamp_ms: u64,
}

impl BarPosition {
    #[inline]
    pub fn new(x: f64, y: f64, confidence: f32, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            confidence,
            timestamp_ms,
        }
    }

    /// Position as a point in image coordinates.
    #[inline]
    pub fn point(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// A position that passed the confidence gate and was smoothed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredPosition {
    /// Smoothed position in image pixels
    pub point: Point2<f64>,
    /// Timestamp of the raw sample that produced this output
    pub timestamp_ms: u64,
    /// True when this is the first sample of a new continuous segment
    /// (session start, after a gap, or after signal loss).
    pub segment_start: bool,
    /// True when the segment restarted because no sample was accepted for
    /// longer than the maximum gap. The set is paused at this point.
    pub gap_reset: bool,
}

/// Image axis, used to document how a calibration reference was measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    #[default]
    Vertical,
}

/// Direction of concentric (force-producing) movement in the image.
///
/// Velocities are projected onto this direction, so a positive velocity
/// always means the bar is moving concentrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    /// Vertical lifts: squat, bench, deadlift
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl MovementDirection {
    /// Unit vector of the concentric direction in image coordinates.
    #[inline]
    pub fn unit(&self) -> Vector2<f64> {
        match self {
            Self::Up => Vector2::new(0.0, -1.0),
            Self::Down => Vector2::new(0.0, 1.0),
            Self::Left => Vector2::new(-1.0, 0.0),
            Self::Right => Vector2::new(1.0, 0.0),
        }
    }

    /// Axis the movement runs along.
    #[inline]
    pub fn axis(&self) -> Axis {
        match self {
            Self::Up | Self::Down => Axis::Vertical,
            Self::Left | Self::Right => Axis::Horizontal,
        }
    }
}
