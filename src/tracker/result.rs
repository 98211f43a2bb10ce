//! Set summary produced when a tracking session is finalized.

use serde::{Deserialize, Serialize};

use crate::tracker::rep_segmenter::RepData;

/// How a session came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The caller called `finish()`
    #[default]
    Explicit,
    /// No samples arrived for longer than the idle timeout
    IdleTimeout,
}

/// Per-session counters for signal quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub samples_received: u64,
    pub samples_accepted: u64,
    pub low_confidence_dropped: u64,
    pub out_of_order_dropped: u64,
    pub signal_lost_events: u32,
    pub gap_resets: u32,
    pub discarded_reps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarTrackingResult {
    /// Completed reps in the order they were performed
    pub reps: Vec<RepData>,
    pub total_reps: usize,
    /// Highest concentric mean velocity in the set (m/s), 0 without reps
    pub best_set_mean_velocity: f64,
    /// Drop from the first to the last rep's concentric mean velocity, in
    /// percent. 0 with fewer than two reps.
    pub velocity_loss_percent: f64,
    pub session_duration_ms: u64,
    pub finish_reason: FinishReason,
    pub stats: SessionStats,
}

impl BarTrackingResult {
    pub fn from_reps(
        reps: Vec<RepData>,
        session_duration_ms: u64,
        finish_reason: FinishReason,
        stats: SessionStats,
    ) -> Self {
        let best_set_mean_velocity = reps
            .iter()
            .map(|r| r.concentric_mean_velocity)
            .fold(0.0, f64::max);
        let velocity_loss_percent = velocity_loss_percent(&reps);
        Self {
            total_reps: reps.len(),
            reps,
            best_set_mean_velocity,
            velocity_loss_percent,
            session_duration_ms,
            finish_reason,
            stats,
        }
    }

    /// True when the session ended without receiving a single sample.
    pub fn is_empty(&self) -> bool {
        self.stats.samples_received == 0
    }
}

fn velocity_loss_percent(reps: &[RepData]) -> f64 {
    let (Some(first), Some(last)) = (reps.first(), reps.last()) else {
        return 0.0;
    };
    let first_velocity = first.concentric_mean_velocity;
    if reps.len() < 2 || first_velocity <= 0.0 {
        return 0.0;
    }
    (first_velocity - last.concentric_mean_velocity) / first_velocity * 100.0
}
