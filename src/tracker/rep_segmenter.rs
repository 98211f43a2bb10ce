//! Repetition segmentation over the windowed velocity signal.
//!
//! The segmenter walks `Idle -> Eccentric -> BottomPause -> Concentric ->
//! TopPause -> Idle`. Each state carries the bookkeeping it needs, so a
//! rep can only be emitted from `TopPause` after passing through every
//! earlier phase.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tracker::config::TrackerConfig;
use crate::tracker::rep_phase::RepPhase;
use crate::tracker::velocity::VelocityData;

/// Time spent in each phase of a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub eccentric_ms: u64,
    pub pause_ms: u64,
    pub concentric_ms: u64,
}

/// One completed repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepData {
    /// Zero-based position of the rep within the set
    pub rep_index: u32,
    /// Onset of the eccentric phase
    pub start_timestamp_ms: u64,
    /// End of the concentric phase
    pub end_timestamp_ms: u64,
    /// Time-weighted mean velocity over the concentric phase (m/s)
    pub concentric_mean_velocity: f64,
    /// Highest instantaneous velocity during the concentric phase (m/s)
    pub peak_velocity: f64,
    /// Distance between the bottom of the rep and the end of the concentric phase
    pub range_of_motion_m: f64,
    pub phase_durations: PhaseDurations,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    timestamp_ms: u64,
    position_m: Point2<f64>,
}

impl Anchor {
    fn at(v: &VelocityData) -> Self {
        Self {
            timestamp_ms: v.timestamp_ms,
            position_m: v.position_m,
        }
    }
}

/// Start of a rep and the deepest point reached so far.
#[derive(Debug, Clone, Copy)]
struct RepTrace {
    start: Anchor,
    bottom_m: Point2<f64>,
    bottom_height: f64,
}

impl RepTrace {
    fn new(start: Anchor, direction: &Vector2<f64>) -> Self {
        Self {
            start,
            bottom_m: start.position_m,
            bottom_height: start.position_m.coords.dot(direction),
        }
    }

    fn observe(&mut self, v: &VelocityData, direction: &Vector2<f64>) {
        let height = v.position_m.coords.dot(direction);
        if height < self.bottom_height {
            self.bottom_height = height;
            self.bottom_m = v.position_m;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ConcentricStats {
    weighted_sum: f64,
    duration_ms: u64,
    peak: f64,
}

impl ConcentricStats {
    fn started(v: &VelocityData) -> Self {
        let mut stats = Self {
            peak: f64::NEG_INFINITY,
            ..Self::default()
        };
        stats.record(v);
        stats
    }

    fn record(&mut self, v: &VelocityData) {
        self.weighted_sum += v.instantaneous_velocity * v.interval_ms as f64;
        self.duration_ms += v.interval_ms;
        self.peak = self.peak.max(v.instantaneous_velocity);
    }

    fn mean(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            self.weighted_sum / self.duration_ms as f64
        }
    }
}

/// A rep whose concentric phase has ended, waiting in `TopPause`.
#[derive(Debug, Clone, Copy)]
struct FinishedRep {
    start_ms: u64,
    end_ms: u64,
    durations: PhaseDurations,
    stats: ConcentricStats,
    range_of_motion_m: f64,
}

#[derive(Debug, Clone, Copy)]
enum RepState {
    Idle {
        /// Last sample at which the bar was not descending
        anchor: Option<Anchor>,
    },
    Eccentric {
        trace: RepTrace,
    },
    BottomPause {
        trace: RepTrace,
        bottom_ms: u64,
    },
    Concentric {
        trace: RepTrace,
        eccentric_ms: u64,
        pause_ms: u64,
        concentric_start_ms: u64,
        stats: ConcentricStats,
    },
    TopPause {
        rep: FinishedRep,
    },
}

impl RepState {
    fn phase(&self) -> RepPhase {
        match self {
            Self::Idle { .. } => RepPhase::Idle,
            Self::Eccentric { .. } => RepPhase::Eccentric,
            Self::BottomPause { .. } => RepPhase::BottomPause,
            Self::Concentric { .. } => RepPhase::Concentric,
            Self::TopPause { .. } => RepPhase::TopPause,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepSegmenter {
    state: RepState,
    threshold: f64,
    min_rep_duration_ms: u64,
    direction: Vector2<f64>,
    next_index: u32,
    discarded: u32,
}

impl RepSegmenter {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            state: RepState::Idle { anchor: None },
            threshold: config.velocity_threshold,
            min_rep_duration_ms: config.min_rep_duration_ms,
            direction: config.direction.unit(),
            next_index: 0,
            discarded: 0,
        }
    }

    pub fn phase(&self) -> RepPhase {
        self.state.phase()
    }

    /// Reps dropped for being too short or interrupted.
    pub fn discarded_reps(&self) -> u32 {
        self.discarded
    }

    /// Advance the state machine by one velocity sample.
    ///
    /// A velocity exactly at the threshold counts as below it.
    pub fn update(&mut self, v: &VelocityData) -> Option<RepData> {
        let thr = self.threshold;
        let mean = v.mean_velocity_window;
        let previous = self.state.phase();

        let state = self.state;
        let (next, rep) = match state {
            RepState::Idle { anchor } => (self.idle_step(anchor, v), None),
            RepState::Eccentric { mut trace } => {
                trace.observe(v, &self.direction);
                if mean > thr {
                    // Touch-and-go: the bar reversed without a measurable stop
                    let concentric = RepState::Concentric {
                        trace,
                        eccentric_ms: v.timestamp_ms - trace.start.timestamp_ms,
                        pause_ms: 0,
                        concentric_start_ms: v.timestamp_ms,
                        stats: ConcentricStats::started(v),
                    };
                    (concentric, None)
                } else if mean.abs() <= thr {
                    let pause = RepState::BottomPause {
                        trace,
                        bottom_ms: v.timestamp_ms,
                    };
                    (pause, None)
                } else {
                    (RepState::Eccentric { trace }, None)
                }
            }
            RepState::BottomPause {
                mut trace,
                bottom_ms,
            } => {
                trace.observe(v, &self.direction);
                if mean > thr {
                    let concentric = RepState::Concentric {
                        trace,
                        eccentric_ms: bottom_ms - trace.start.timestamp_ms,
                        pause_ms: v.timestamp_ms - bottom_ms,
                        concentric_start_ms: v.timestamp_ms,
                        stats: ConcentricStats::started(v),
                    };
                    (concentric, None)
                } else if mean < -thr {
                    // Sticking point on the way down, not the bottom
                    (RepState::Eccentric { trace }, None)
                } else {
                    (RepState::BottomPause { trace, bottom_ms }, None)
                }
            }
            RepState::Concentric {
                trace,
                eccentric_ms,
                pause_ms,
                concentric_start_ms,
                mut stats,
            } => {
                if mean > thr {
                    stats.record(v);
                    let concentric = RepState::Concentric {
                        trace,
                        eccentric_ms,
                        pause_ms,
                        concentric_start_ms,
                        stats,
                    };
                    (concentric, None)
                } else {
                    let rep = FinishedRep {
                        start_ms: trace.start.timestamp_ms,
                        end_ms: v.timestamp_ms,
                        durations: PhaseDurations {
                            eccentric_ms,
                            pause_ms,
                            concentric_ms: v.timestamp_ms - concentric_start_ms,
                        },
                        stats,
                        range_of_motion_m: (v.position_m - trace.bottom_m).norm(),
                    };
                    self.settle_top(rep, v)
                }
            }
            RepState::TopPause { rep } => {
                if v.timestamp_ms - rep.start_ms < self.min_rep_duration_ms && mean.abs() > thr {
                    debug!(
                        start_ms = rep.start_ms,
                        timestamp_ms = v.timestamp_ms,
                        "rep shorter than minimum duration, discarding"
                    );
                    self.discarded += 1;
                    (self.idle_step(None, v), None)
                } else {
                    self.settle_top(rep, v)
                }
            }
        };

        self.state = next;
        let current = self.state.phase();
        if current != previous {
            debug!(
                from = ?previous,
                to = ?current,
                timestamp_ms = v.timestamp_ms,
                mean_velocity = mean,
                "rep phase transition"
            );
        }
        rep
    }

    /// Force the segmenter back to `Idle`, discarding any rep in flight.
    ///
    /// Returns whether a rep was discarded.
    pub fn abandon(&mut self) -> bool {
        let in_flight = !matches!(self.state, RepState::Idle { .. });
        if in_flight {
            debug!(phase = ?self.state.phase(), "discarding rep in progress");
            self.discarded += 1;
        }
        self.state = RepState::Idle { anchor: None };
        in_flight
    }

    fn idle_step(&self, anchor: Option<Anchor>, v: &VelocityData) -> RepState {
        let here = Anchor::at(v);
        if v.mean_velocity_window < -self.threshold {
            let mut trace = RepTrace::new(anchor.unwrap_or(here), &self.direction);
            trace.observe(v, &self.direction);
            return RepState::Eccentric { trace };
        }
        let anchor = if v.instantaneous_velocity >= -self.threshold {
            Some(here)
        } else {
            anchor
        };
        RepState::Idle { anchor }
    }

    fn settle_top(&mut self, rep: FinishedRep, v: &VelocityData) -> (RepState, Option<RepData>) {
        if v.timestamp_ms - rep.start_ms < self.min_rep_duration_ms {
            return (RepState::TopPause { rep }, None);
        }

        let data = RepData {
            rep_index: self.next_index,
            start_timestamp_ms: rep.start_ms,
            end_timestamp_ms: rep.end_ms,
            concentric_mean_velocity: rep.stats.mean(),
            peak_velocity: rep.stats.peak,
            range_of_motion_m: rep.range_of_motion_m,
            phase_durations: rep.durations,
        };
        self.next_index += 1;
        info!(
            rep_index = data.rep_index,
            mean_velocity = data.concentric_mean_velocity,
            peak_velocity = data.peak_velocity,
            rom_m = data.range_of_motion_m,
            "rep completed"
        );
        // The same sample may already be the onset of the next descent
        (self.idle_step(Some(Anchor::at(v)), v), Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vd(timestamp_ms: u64, inst: f64, mean: f64, y: f64) -> VelocityData {
        VelocityData {
            timestamp_ms,
            instantaneous_velocity: inst,
            mean_velocity_window: mean,
            position_m: Point2::new(0.0, y),
            interval_ms: 50,
        }
    }

    /// Descend 75 mm, pause, rise back up. Image y grows downward.
    fn cycle(offset: u64) -> Vec<VelocityData> {
        vec![
            vd(offset, 0.0, 0.0, 0.0),
            vd(offset + 50, -0.5, -0.3, 0.025),
            vd(offset + 100, -0.5, -0.5, 0.05),
            vd(offset + 150, -0.5, -0.5, 0.075),
            vd(offset + 200, 0.0, -0.02, 0.075),
            vd(offset + 250, 0.0, 0.0, 0.075),
            vd(offset + 300, 0.6, 0.2, 0.045),
            vd(offset + 350, 0.6, 0.6, 0.015),
            vd(offset + 400, 0.3, 0.5, 0.0),
            vd(offset + 450, 0.0, 0.04, 0.0),
        ]
    }

    fn run(seg: &mut RepSegmenter, samples: &[VelocityData]) -> Vec<RepData> {
        samples.iter().filter_map(|v| seg.update(v)).collect()
    }

    #[test]
    fn test_full_cycle_emits_rep() {
        let mut seg = RepSegmenter::new(&TrackerConfig::default());
        let reps = run(&mut seg, &cycle(0));
        assert_eq!(reps.len(), 1);

        let rep = &reps[0];
        assert_eq!(rep.rep_index, 0);
        assert_eq!(rep.start_timestamp_ms, 0);
        assert_eq!(rep.end_timestamp_ms, 450);
        assert_eq!(
            rep.phase_durations,
            PhaseDurations {
                eccentric_ms: 200,
                pause_ms: 100,
                concentric_ms: 150
            }
        );
        assert_relative_eq!(rep.concentric_mean_velocity, 0.5, epsilon = 1e-12);
        assert_relative_eq!(rep.peak_velocity, 0.6);
        assert_relative_eq!(rep.range_of_motion_m, 0.075, epsilon = 1e-12);
        assert_eq!(seg.phase(), RepPhase::Idle);
    }

    #[test]
    fn test_phase_sequence() {
        let mut seg = RepSegmenter::new(&TrackerConfig::default());
        let phases: Vec<RepPhase> = cycle(0)
            .iter()
            .map(|v| {
                seg.update(v);
                seg.phase()
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                RepPhase::Idle,
                RepPhase::Eccentric,
                RepPhase::Eccentric,
                RepPhase::Eccentric,
                RepPhase::BottomPause,
                RepPhase::BottomPause,
                RepPhase::Concentric,
                RepPhase::Concentric,
                RepPhase::Concentric,
                RepPhase::Idle,
            ]
        );
    }

    #[test]
    fn test_consecutive_reps_are_indexed() {
        let mut seg = RepSegmenter::new(&TrackerConfig::default());
        let mut samples = cycle(0);
        samples.extend(cycle(1000));
        let reps = run(&mut seg, &samples);
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[1].rep_index, 1);
        assert_eq!(reps[1].start_timestamp_ms, 1000);
    }

    #[test]
    fn test_abandon_discards_rep_in_flight() {
        let mut seg = RepSegmenter::new(&TrackerConfig::default());
        let samples = cycle(0);
        assert!(run(&mut seg, &samples[..7]).is_empty());
        assert_eq!(seg.phase(), RepPhase::Concentric);

        assert!(seg.abandon());
        assert_eq!(seg.phase(), RepPhase::Idle);
        assert_eq!(seg.discarded_reps(), 1);

        // The rest of the rising motion cannot complete a rep
        assert!(run(&mut seg, &samples[7..]).is_empty());
        assert!(!seg.abandon());
    }

    #[test]
    fn test_short_rep_discarded_when_motion_resumes() {
        let config = TrackerConfig::default().with_min_rep_duration_ms(1000);
        let mut seg = RepSegmenter::new(&config);
        assert!(run(&mut seg, &cycle(0)).is_empty());
        assert_eq!(seg.phase(), RepPhase::TopPause);

        // Bar drops again before the rep could count
        assert!(seg.update(&vd(500, -0.5, -0.3, 0.025)).is_none());
        assert_eq!(seg.discarded_reps(), 1);
        assert_eq!(seg.phase(), RepPhase::Eccentric);
    }

    #[test]
    fn test_rep_counted_once_minimum_duration_elapses() {
        let config = TrackerConfig::default().with_min_rep_duration_ms(600);
        let mut seg = RepSegmenter::new(&config);
        assert!(run(&mut seg, &cycle(0)).is_empty());
        assert!(seg.update(&vd(500, 0.0, 0.0, 0.0)).is_none());
        let rep = seg.update(&vd(600, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(rep.end_timestamp_ms, 450);
        assert_eq!(seg.phase(), RepPhase::Idle);
    }

    #[test]
    fn test_next_descent_starts_on_emitting_sample() {
        let config = TrackerConfig::default().with_min_rep_duration_ms(600);
        let mut seg = RepSegmenter::new(&config);
        assert!(run(&mut seg, &cycle(0)).is_empty());
        assert_eq!(seg.phase(), RepPhase::TopPause);

        let rep = seg.update(&vd(600, -0.5, -0.3, 0.025)).unwrap();
        assert_eq!(rep.rep_index, 0);
        assert_eq!(seg.phase(), RepPhase::Eccentric);
        assert_eq!(seg.discarded_reps(), 0);

        let mut rest: Vec<VelocityData> = cycle(550).into_iter().skip(2).collect();
        rest.push(vd(1200, 0.0, 0.0, 0.0));
        let reps = run(&mut seg, &rest);
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].rep_index, 1);
        assert_eq!(reps[0].start_timestamp_ms, 600);
    }

    #[test]
    fn test_velocity_at_threshold_counts_as_still() {
        let mut seg = RepSegmenter::new(&TrackerConfig::default());
        seg.update(&vd(0, 0.0, 0.0, 0.0));
        seg.update(&vd(50, -0.05, -0.05, 0.0025));
        assert_eq!(seg.phase(), RepPhase::Idle);
        seg.update(&vd(100, -0.2, -0.051, 0.01));
        assert_eq!(seg.phase(), RepPhase::Eccentric);
    }

    #[test]
    fn test_touch_and_go_skips_pause() {
        let mut seg = RepSegmenter::new(&TrackerConfig::default());
        let samples = vec![
            vd(0, 0.0, 0.0, 0.0),
            vd(50, -0.8, -0.4, 0.04),
            vd(100, -0.8, -0.8, 0.08),
            vd(150, 0.8, 0.3, 0.04),
            vd(200, 0.8, 0.8, 0.0),
            vd(250, 0.0, 0.0, 0.0),
        ];
        let config = TrackerConfig::default().with_min_rep_duration_ms(200);
        let mut seg_short = RepSegmenter::new(&config);
        let reps = run(&mut seg_short, &samples);
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].phase_durations.pause_ms, 0);
        assert_relative_eq!(reps[0].range_of_motion_m, 0.08, epsilon = 1e-12);

        // Default minimum of 400 ms holds the rep in TopPause
        run(&mut seg, &samples);
        assert_eq!(seg.phase(), RepPhase::TopPause);
    }
}
