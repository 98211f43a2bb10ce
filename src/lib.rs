//! Velocity-based training bar tracking.
//!
//! Turns a stream of noisy, timestamped 2-D bar positions from any
//! object or pose detector into calibrated velocity, per-rep phase
//! segmentation and set-level metrics (mean concentric velocity, peak
//! velocity, range of motion, velocity loss).
//!
//! ```
//! use bartrack_rs::{BarPosition, CameraCalibration, TrackingSession};
//!
//! let mut session = TrackingSession::with_default_config(CameraCalibration::new(1000.0))?;
//! session.add_sample(BarPosition::new(320.0, 240.0, 0.95, 0))?;
//! let result = session.finish();
//! assert_eq!(result.total_reps, 0);
//! # Ok::<(), bartrack_rs::TrackingError>(())
//! ```

pub mod integration;
pub mod tracker;

pub use integration::{BarPositionBuilder, IntoBarPosition, PositionSource, TrackerPipeline};
pub use tracker::{
    BarPosition, BarTrackingResult, CameraCalibration, LiveReadout, MovementDirection, RepData,
    RepPhase, TrackerConfig, TrackingError, TrackingSession,
};
