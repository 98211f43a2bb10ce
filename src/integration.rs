//! Integration module for connecting position detectors with the bar tracker.
//!
//! The engine only needs a position, a confidence and a timestamp per
//! frame. This module provides traits and utilities for adapting any
//! detector output (pose keypoints, object boxes, marker trackers) to
//! that shape and feeding it into a `TrackingSession`.

mod builder;
mod detector;
mod pipeline;

pub use builder::BarPositionBuilder;
pub use detector::{IntoBarPosition, PositionSource};
pub use pipeline::{PipelineError, TrackerPipeline};
