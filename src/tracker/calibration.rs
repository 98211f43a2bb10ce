//! Pixel to meter conversion for one capture session.

use serde::{Deserialize, Serialize};

use crate::tracker::error::TrackingError;
use crate::tracker::position::Axis;

/// Mapping from image distance to real-world distance.
///
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub pixels_per_meter: f64,
    /// Length of the physical reference used to derive the scale, in meters
    pub reference_distance_m: f64,
    /// Image axis the reference was measured along
    pub reference_axis: Axis,
}

impl CameraCalibration {
    /// Calibration from a known scale. Not validated until used.
    pub fn new(pixels_per_meter: f64) -> Self {
        Self {
            pixels_per_meter,
            reference_distance_m: 1.0,
            reference_axis: Axis::Vertical,
        }
    }

    /// Calibration from a reference object of known size, e.g. a 0.45 m
    /// plate spanning `pixel_length` pixels.
    pub fn from_reference(
        pixel_length: f64,
        reference_distance_m: f64,
        reference_axis: Axis,
    ) -> Result<Self, TrackingError> {
        let pixels_per_meter = if reference_distance_m > 0.0 {
            pixel_length / reference_distance_m
        } else {
            0.0
        };
        let calibration = Self {
            pixels_per_meter,
            reference_distance_m,
            reference_axis,
        };
        calibration.validate()?;
        Ok(calibration)
    }

    pub fn validate(&self) -> Result<(), TrackingError> {
        if !(self.pixels_per_meter.is_finite() && self.pixels_per_meter > 0.0) {
            return Err(TrackingError::InvalidCalibration {
                pixels_per_meter: self.pixels_per_meter,
            });
        }
        Ok(())
    }

    /// Convert a pixel distance to meters.
    pub fn to_meters(&self, pixel_distance: f64) -> Result<f64, TrackingError> {
        self.validate()?;
        Ok(pixel_distance / self.pixels_per_meter)
    }
}
