//! TrackerPipeline for combining a position source with a tracking session.

use thiserror::Error;

use crate::tracker::{
    BarTrackingResult, CameraCalibration, TrackerConfig, TrackingError, TrackingSession,
};

use super::PositionSource;

#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("position source failed: {0}")]
    Source(E),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

/// A combined tracker that bundles a position source with a session.
///
/// This struct provides a convenient way to run end-to-end tracking of a
/// set by draining any `PositionSource` into a `TrackingSession`.
pub struct TrackerPipeline<S: PositionSource> {
    source: S,
    session: TrackingSession,
}

impl<S: PositionSource> TrackerPipeline<S> {
    /// Create a new tracking pipeline with the given source and session setup.
    pub fn new(
        source: S,
        config: TrackerConfig,
        calibration: CameraCalibration,
    ) -> Result<Self, TrackingError> {
        Ok(Self {
            source,
            session: TrackingSession::new(config, calibration)?,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(
        source: S,
        calibration: CameraCalibration,
    ) -> Result<Self, TrackingError> {
        Self::new(source, TrackerConfig::default(), calibration)
    }

    /// Pull one position from the source and feed it to the session.
    ///
    /// # Returns
    /// `false` once the source is exhausted.
    pub fn process_next(&mut self) -> Result<bool, PipelineError<S::Error>> {
        match self.source.next_position().map_err(PipelineError::Source)? {
            Some(position) => {
                self.session.add_sample(position)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drain the source and finalize the session.
    pub fn run_to_end(&mut self) -> Result<BarTrackingResult, PipelineError<S::Error>> {
        while self.process_next()? {}
        Ok(self.session.finish())
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Get a reference to the underlying session.
    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    /// Get a mutable reference to the underlying session.
    pub fn session_mut(&mut self) -> &mut TrackingSession {
        &mut self.session
    }
}
