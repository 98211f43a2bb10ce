//! Tracking session: one set, from first sample to summary.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::tracker::calibration::CameraCalibration;
use crate::tracker::config::TrackerConfig;
use crate::tracker::error::TrackingError;
use crate::tracker::position::BarPosition;
use crate::tracker::rep_phase::RepPhase;
use crate::tracker::rep_segmenter::{RepData, RepSegmenter};
use crate::tracker::result::{BarTrackingResult, FinishReason, SessionStats};
use crate::tracker::sample_filter::{FilterOutput, SampleFilter};
use crate::tracker::velocity::{VelocityData, VelocityEstimator};

/// Running values for a live display while the set is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveReadout {
    pub rep_count: usize,
    pub phase: RepPhase,
    pub instantaneous_velocity: Option<f64>,
    pub mean_velocity: Option<f64>,
    pub last_rep_mean_velocity: Option<f64>,
    pub signal_lost: bool,
}

/// Owns the filter, estimator and segmenter for one set.
///
/// Samples must arrive in timestamp order. Once finalized, by `finish()`
/// or by `check_idle()`, the session rejects further samples.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    config: TrackerConfig,
    calibration: CameraCalibration,
    filter: SampleFilter,
    estimator: VelocityEstimator,
    segmenter: RepSegmenter,
    reps: Vec<RepData>,
    last_velocity: Option<VelocityData>,
    first_timestamp_ms: Option<u64>,
    last_timestamp_ms: Option<u64>,
    stats: SessionStats,
    result: Option<BarTrackingResult>,
}

impl TrackingSession {
    pub fn new(
        config: TrackerConfig,
        calibration: CameraCalibration,
    ) -> Result<Self, TrackingError> {
        config.validate()?;
        calibration.validate()?;
        let estimator = VelocityEstimator::new(&config, &calibration)?;
        Ok(Self {
            filter: SampleFilter::new(&config),
            segmenter: RepSegmenter::new(&config),
            estimator,
            config,
            calibration,
            reps: Vec::new(),
            last_velocity: None,
            first_timestamp_ms: None,
            last_timestamp_ms: None,
            stats: SessionStats::default(),
            result: None,
        })
    }

    /// Session with default thresholds.
    pub fn with_default_config(calibration: CameraCalibration) -> Result<Self, TrackingError> {
        Self::new(TrackerConfig::default(), calibration)
    }

    /// Route one sample through filter, estimator and segmenter.
    ///
    /// Out-of-order and low-confidence samples are absorbed; the only
    /// error is submitting to a finalized session. A sample arriving at
    /// least the idle timeout after the previous one finalizes the session
    /// first and is rejected.
    pub fn add_sample(&mut self, sample: BarPosition) -> Result<(), TrackingError> {
        if self.result.is_some() {
            return Err(TrackingError::SessionFinalized);
        }
        if self.check_idle(sample.timestamp_ms) {
            return Err(TrackingError::SessionFinalized);
        }
        self.stats.samples_received += 1;

        let output = match self.filter.push(&sample) {
            Ok(output) => output,
            Err(err @ TrackingError::OutOfOrderSample { .. }) => {
                warn!(error = %err, "dropping sample");
                self.stats.out_of_order_dropped += 1;
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        self.first_timestamp_ms.get_or_insert(sample.timestamp_ms);
        self.last_timestamp_ms = Some(sample.timestamp_ms);

        match output {
            FilterOutput::Accepted(position) => {
                self.stats.samples_accepted += 1;
                if position.gap_reset {
                    // Nothing seen across the gap, so no rep can span it
                    self.segmenter.abandon();
                    self.last_velocity = None;
                }
                if let Some(velocity) = self.estimator.update(&position) {
                    self.last_velocity = Some(velocity);
                    if let Some(rep) = self.segmenter.update(&velocity) {
                        self.reps.push(rep);
                    }
                }
            }
            FilterOutput::Dropped => {
                self.stats.low_confidence_dropped += 1;
            }
            FilterOutput::SignalLost => {
                self.stats.low_confidence_dropped += 1;
                self.stats.signal_lost_events += 1;
                self.segmenter.abandon();
                self.estimator.reset();
                self.last_velocity = None;
            }
        }
        Ok(())
    }

    /// Finalize the session and return its summary.
    ///
    /// Repeat calls return the stored result unchanged. A rep still in
    /// progress is discarded.
    pub fn finish(&mut self) -> BarTrackingResult {
        self.finalize(FinishReason::Explicit)
    }

    /// Finalize the session if no sample arrived within the idle timeout.
    ///
    /// Returns true when this call finalized the session. A session that
    /// never received a sample does not time out.
    pub fn check_idle(&mut self, now_ms: u64) -> bool {
        if self.result.is_some() {
            return false;
        }
        let Some(last) = self.last_timestamp_ms else {
            return false;
        };
        if now_ms.saturating_sub(last) < self.config.idle_timeout_ms {
            return false;
        }
        debug!(now_ms, last_sample_ms = last, "session idle, finalizing");
        self.finalize(FinishReason::IdleTimeout);
        true
    }

    fn finalize(&mut self, reason: FinishReason) -> BarTrackingResult {
        if let Some(result) = &self.result {
            return result.clone();
        }

        self.segmenter.abandon();

        let duration_ms = match (self.first_timestamp_ms, self.last_timestamp_ms) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        };
        let result =
            BarTrackingResult::from_reps(self.reps.clone(), duration_ms, reason, self.stats());
        if result.is_empty() {
            info!("session finished without samples");
        } else {
            info!(
                reps = result.total_reps,
                best_mean_velocity = result.best_set_mean_velocity,
                velocity_loss_percent = result.velocity_loss_percent,
                reason = ?reason,
                "session finished"
            );
        }
        self.result = Some(result.clone());
        result
    }

    pub fn readout(&self) -> LiveReadout {
        LiveReadout {
            rep_count: self.reps.len(),
            phase: self.segmenter.phase(),
            instantaneous_velocity: self.last_velocity.map(|v| v.instantaneous_velocity),
            mean_velocity: self.last_velocity.map(|v| v.mean_velocity_window),
            last_rep_mean_velocity: self.reps.last().map(|r| r.concentric_mean_velocity),
            signal_lost: self.filter.is_signal_lost(),
        }
    }

    /// Reps completed so far.
    pub fn reps(&self) -> &[RepData] {
        &self.reps
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&BarTrackingResult> {
        self.result.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            gap_resets: self.filter.gap_resets(),
            discarded_reps: self.segmenter.discarded_reps(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn calibration(&self) -> &CameraCalibration {
        &self.calibration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> TrackingSession {
        TrackingSession::with_default_config(CameraCalibration::new(1000.0)).unwrap()
    }

    #[test]
    fn test_rejects_bad_setup() {
        assert!(matches!(
            TrackingSession::with_default_config(CameraCalibration::new(-1.0)),
            Err(TrackingError::InvalidCalibration { .. })
        ));
        let config = TrackerConfig::default().with_velocity_threshold(0.0);
        assert!(matches!(
            TrackingSession::new(config, CameraCalibration::new(1000.0)),
            Err(TrackingError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_out_of_order_absorbed() {
        let mut s = session();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 100)).unwrap();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 50)).unwrap();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 150)).unwrap();

        let stats = s.stats();
        assert_eq!(stats.samples_received, 3);
        assert_eq!(stats.samples_accepted, 2);
        assert_eq!(stats.out_of_order_dropped, 1);
        assert_eq!(s.finish().session_duration_ms, 50);
    }

    #[test]
    fn test_sample_after_finish_rejected() {
        let mut s = session();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 0)).unwrap();
        s.finish();
        assert_eq!(
            s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 10)),
            Err(TrackingError::SessionFinalized)
        );
    }

    #[test]
    fn test_idle_timeout_finalizes() {
        let mut s = session();
        assert!(!s.check_idle(60_000));

        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 1_000)).unwrap();
        assert!(!s.check_idle(10_999));
        assert!(s.check_idle(11_000));
        assert!(s.is_finished());
        assert!(!s.check_idle(20_000));

        let result = s.finish();
        assert_eq!(result.finish_reason, FinishReason::IdleTimeout);
    }

    #[test]
    fn test_late_sample_times_out_session() {
        let mut s = session();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 0)).unwrap();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 9_999)).unwrap();
        assert_eq!(
            s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 69_999)),
            Err(TrackingError::SessionFinalized)
        );
        assert!(s.is_finished());

        let result = s.finish();
        assert_eq!(result.finish_reason, FinishReason::IdleTimeout);
        assert_eq!(result.stats.samples_received, 2);
        assert_eq!(result.session_duration_ms, 9_999);
    }

    #[test]
    fn test_gap_abandons_rep_in_progress() {
        let mut s = session();
        // Bar descends 200 px over 400 ms, then the detector goes quiet
        for i in 0..=20u64 {
            let y = 100.0 + 10.0 * i as f64;
            s.add_sample(BarPosition::new(0.0, y, 1.0, i * 20)).unwrap();
        }
        assert_eq!(s.readout().phase, RepPhase::Eccentric);

        s.add_sample(BarPosition::new(0.0, 300.0, 1.0, 2_000)).unwrap();
        assert_eq!(s.readout().phase, RepPhase::Idle);
        assert!(s.readout().instantaneous_velocity.is_none());

        let stats = s.stats();
        assert_eq!(stats.gap_resets, 1);
        assert_eq!(stats.discarded_reps, 1);
    }

    #[test]
    fn test_readout_tracks_signal() {
        let mut s = session();
        let readout = s.readout();
        assert_eq!(readout.rep_count, 0);
        assert_eq!(readout.phase, RepPhase::Idle);
        assert!(readout.instantaneous_velocity.is_none());

        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 0)).unwrap();
        s.add_sample(BarPosition::new(0.0, 0.0, 1.0, 20)).unwrap();
        assert_eq!(s.readout().instantaneous_velocity, Some(0.0));

        for ts in [40, 60, 80] {
            s.add_sample(BarPosition::new(0.0, 0.0, 0.0, ts)).unwrap();
        }
        let readout = s.readout();
        assert!(readout.signal_lost);
        assert!(readout.instantaneous_velocity.is_none());
        assert_eq!(s.stats().signal_lost_events, 1);
    }
}
