//! Confidence gating and recency-weighted smoothing of raw detector samples.

use std::collections::VecDeque;

use nalgebra::Point2;
use ndarray::{Array1, s};
use tracing::{debug, trace, warn};

use crate::tracker::config::TrackerConfig;
use crate::tracker::error::TrackingError;
use crate::tracker::position::{BarPosition, FilteredPosition};

/// What the filter did with one raw sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutput {
    /// Sample passed the gate; carries the smoothed position.
    Accepted(FilteredPosition),
    /// Sample was below the confidence threshold and discarded.
    Dropped,
    /// This drop completed a run of consecutive drops long enough to
    /// consider the bar lost. Emitted once per run.
    SignalLost,
}

#[derive(Debug, Clone)]
pub struct SampleFilter {
    window: VecDeque<(Point2<f64>, u64)>,
    /// Recency weights `1..=capacity`, oldest first
    weights: Array1<f64>,
    min_confidence: f32,
    max_gap_ms: u64,
    signal_lost_after: u32,
    consecutive_drops: u32,
    signal_lost: bool,
    last_seen_ms: Option<u64>,
    last_accepted_ms: Option<u64>,
    gap_resets: u32,
}

impl SampleFilter {
    pub fn new(config: &TrackerConfig) -> Self {
        let capacity = config.smoothing_window.max(1);
        Self {
            window: VecDeque::with_capacity(capacity + 1),
            weights: Array1::from_iter((1..=capacity).map(|w| w as f64)),
            min_confidence: config.min_confidence,
            max_gap_ms: config.max_gap_ms,
            signal_lost_after: config.signal_lost_after.max(1),
            consecutive_drops: 0,
            signal_lost: false,
            last_seen_ms: None,
            last_accepted_ms: None,
            gap_resets: 0,
        }
    }

    /// Feed one raw sample.
    ///
    /// Samples older than the previous one are rejected with
    /// `OutOfOrderSample` and leave the filter untouched.
    pub fn push(&mut self, sample: &BarPosition) -> Result<FilterOutput, TrackingError> {
        if let Some(last) = self.last_seen_ms {
            if sample.timestamp_ms < last {
                return Err(TrackingError::OutOfOrderSample {
                    timestamp_ms: sample.timestamp_ms,
                    last_timestamp_ms: last,
                });
            }
        }
        self.last_seen_ms = Some(sample.timestamp_ms);

        // Negated so a NaN confidence is treated as low
        if !(sample.confidence >= self.min_confidence) {
            return Ok(self.drop_sample(sample));
        }
        self.consecutive_drops = 0;

        let mut segment_start = self.window.is_empty();
        if self.signal_lost {
            debug!(timestamp_ms = sample.timestamp_ms, "signal recovered, restarting smoothing");
            self.signal_lost = false;
            self.window.clear();
            segment_start = true;
        }
        let mut gap_reset = false;
        if let Some(last) = self.last_accepted_ms {
            let gap = sample.timestamp_ms - last;
            if gap > self.max_gap_ms && !self.window.is_empty() {
                debug!(gap_ms = gap, "sample gap exceeded, restarting smoothing");
                self.window.clear();
                self.gap_resets += 1;
                segment_start = true;
                gap_reset = true;
            }
        }

        self.window.push_back((sample.point(), sample.timestamp_ms));
        if self.window.len() > self.weights.len() {
            self.window.pop_front();
        }
        self.last_accepted_ms = Some(sample.timestamp_ms);

        Ok(FilterOutput::Accepted(FilteredPosition {
            point: self.smoothed(),
            timestamp_ms: sample.timestamp_ms,
            segment_start,
            gap_reset,
        }))
    }

    fn drop_sample(&mut self, sample: &BarPosition) -> FilterOutput {
        self.consecutive_drops += 1;
        trace!(
            timestamp_ms = sample.timestamp_ms,
            confidence = sample.confidence,
            "dropped low confidence sample"
        );
        if !self.signal_lost && self.consecutive_drops >= self.signal_lost_after {
            warn!(
                timestamp_ms = sample.timestamp_ms,
                drops = self.consecutive_drops,
                "bar signal lost"
            );
            self.signal_lost = true;
            return FilterOutput::SignalLost;
        }
        FilterOutput::Dropped
    }

    /// Weighted moving average of the window, newest sample weighted highest.
    fn smoothed(&self) -> Point2<f64> {
        let n = self.window.len();
        let weights = self.weights.slice(s![..n]);
        let xs: Array1<f64> = self.window.iter().map(|(p, _)| p.x).collect();
        let ys: Array1<f64> = self.window.iter().map(|(p, _)| p.y).collect();
        let total = weights.sum();
        Point2::new(weights.dot(&xs) / total, weights.dot(&ys) / total)
    }

    pub fn is_signal_lost(&self) -> bool {
        self.signal_lost
    }

    /// Number of times a gap forced the smoothing window to restart.
    pub fn gap_resets(&self) -> u32 {
        self.gap_resets
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.consecutive_drops = 0;
        self.signal_lost = false;
        self.last_seen_ms = None;
        self.last_accepted_ms = None;
        self.gap_resets = 0;
    }
}
