mod calibration;
mod config;
mod error;
mod position;
mod rep_phase;
mod rep_segmenter;
mod result;
mod sample_filter;
mod session;
mod velocity;

pub use calibration::CameraCalibration;
pub use config::TrackerConfig;
pub use error::TrackingError;
pub use position::{Axis, BarPosition, FilteredPosition, MovementDirection};
pub use rep_phase::RepPhase;
pub use rep_segmenter::{PhaseDurations, RepData, RepSegmenter};
pub use result::{BarTrackingResult, FinishReason, SessionStats};
pub use sample_filter::{FilterOutput, SampleFilter};
pub use session::{LiveReadout, TrackingSession};
pub use velocity::{VelocityData, VelocityEstimator};
