//! Pursuit state classifier
//!
//! Decides, once per sample, which cue (if any) the gaze is following:
//!
//! 1. A cue is *followed* when its offset is stable (STD below threshold) and,
//!    for the distance/angle strategy, the gaze travelled about as far as the
//!    cue did over the same window.
//! 2. Exactly one followed cue wins outright; none yields `Unknown`.
//! 3. When both are followed the previous state is kept, unless the preferred
//!    cue has disagreed with it for more than `conflict_tolerance` consecutive
//!    samples, in which case the state flips.
//!
//! The hysteresis memory (`last_state`, conflict count) and the offset angle
//! trackers belong to the classifier instance and are cleared by `reset`.

use crate::config::PursuitConfig;
use crate::stats::{CueAngleTrackers, DistanceStats, Movement, StatisticsStrategy, WindowStatistics};
use crate::types::{CueKind, OffsetSample, State};
use crate::window::SampleWindow;
use log::{debug, log_enabled, Level};
use serde::{Deserialize, Serialize};

/// Per-sample evidence for each cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub increasing: bool,
    pub decreasing: bool,
    /// Tie-break winner if both cues are followed
    pub preferred: CueKind,
}

/// Diagnostic detail behind a classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub sample_count: usize,
    pub evidence: Evidence,
    /// Conflict count after this sample
    pub conflict_count: u32,
    pub statistics: WindowStatistics,
}

/// Output of one classification step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub state: State,
    /// `newest - oldest` timestamp of the window
    pub duration_ms: i64,
    pub diagnostics: Diagnostics,
}

/// Stateful classifier with hysteresis
#[derive(Debug, Clone)]
pub struct PursuitClassifier {
    config: PursuitConfig,
    strategy: StatisticsStrategy,
    last_state: State,
    conflict_count: u32,
    angles: CueAngleTrackers,
}

impl PursuitClassifier {
    pub fn new(strategy: StatisticsStrategy, config: PursuitConfig) -> Self {
        Self {
            config,
            strategy,
            last_state: State::Unknown,
            conflict_count: 0,
            angles: CueAngleTrackers::default(),
        }
    }

    pub fn strategy(&self) -> StatisticsStrategy {
        self.strategy
    }

    pub fn last_state(&self) -> State {
        self.last_state
    }

    pub fn conflict_count(&self) -> u32 {
        self.conflict_count
    }

    /// Forget hysteresis and angle continuity (session restart or saccade)
    pub fn reset(&mut self) {
        self.last_state = State::Unknown;
        self.conflict_count = 0;
        self.angles.reset();
    }

    /// Classify the current window contents.
    ///
    /// Returns `None` for an empty window. Readiness gating is the caller's
    /// job; any non-empty window is classified.
    pub fn classify(&mut self, window: &SampleWindow<OffsetSample>) -> Option<Classification> {
        let angles = if self.config.track_angles {
            Some(&mut self.angles)
        } else {
            None
        };
        let statistics = WindowStatistics::compute(self.strategy, window, angles)?;

        let evidence = self.evidence(&statistics);
        let state = self.decide(evidence);
        let duration_ms = window.span_ms();

        if log_enabled!(Level::Debug) {
            debug!(
                "{:>8}ms {:<8} n={} cdc={} {}",
                duration_ms,
                state,
                window.len(),
                self.conflict_count,
                describe(&statistics)
            );
        }

        Some(Classification {
            state,
            duration_ms,
            diagnostics: Diagnostics {
                sample_count: window.len(),
                evidence,
                conflict_count: self.conflict_count,
                statistics,
            },
        })
    }

    /// Evaluate both cues against the thresholds
    pub fn evidence(&self, statistics: &WindowStatistics) -> Evidence {
        match statistics {
            WindowStatistics::CentroidSpread { increase, decrease } => {
                let threshold = self.config.distance_std_threshold_px;
                Evidence {
                    increasing: increase.spread < threshold,
                    decreasing: decrease.spread < threshold,
                    preferred: if increase.spread < decrease.spread {
                        CueKind::Increase
                    } else {
                        CueKind::Decrease
                    },
                }
            }
            WindowStatistics::DistanceAngle {
                track,
                increase,
                decrease,
            } => {
                let increase_gap = track.direction.distance_to(increase.cue.direction);
                let decrease_gap = track.direction.distance_to(decrease.cue.direction);
                Evidence {
                    increasing: self.is_following(track, increase),
                    decreasing: self.is_following(track, decrease),
                    preferred: if increase_gap < decrease_gap {
                        CueKind::Increase
                    } else {
                        CueKind::Decrease
                    },
                }
            }
        }
    }

    fn is_following(&self, track: &Movement, stats: &DistanceStats) -> bool {
        let threshold = self.config.distance_std_threshold_px;
        let variance = self.config.max_displacement_variance;

        if stats.distance_std >= threshold {
            return false;
        }

        let expected = stats.cue.distance;
        if !(track.distance < expected * (1.0 + variance)
            && track.distance > expected * (1.0 - variance))
        {
            return false;
        }

        // Far from the cue a small angular wobble is a large offset change
        match stats.angle_std_deg {
            Some(angle_std) if stats.distance_mean > 5.0 * threshold => {
                angle_std < self.config.angle_std_threshold_deg
            }
            _ => true,
        }
    }

    /// Apply the decision table and hysteresis to one sample's evidence
    pub fn decide(&mut self, evidence: Evidence) -> State {
        let previous_conflicts = self.conflict_count;
        self.conflict_count = 0;

        let state = match (evidence.increasing, evidence.decreasing) {
            (true, true) => {
                let preferred = State::from(evidence.preferred);
                let mut state = self.last_state;
                if state != State::Unknown && state != preferred {
                    if previous_conflicts > self.config.conflict_tolerance {
                        state = preferred;
                    } else {
                        self.conflict_count = previous_conflicts + 1;
                    }
                }
                state
            }
            (true, false) => State::Increase,
            (false, true) => State::Decrease,
            (false, false) => State::Unknown,
        };

        self.last_state = state;
        state
    }
}

fn describe(statistics: &WindowStatistics) -> String {
    match statistics {
        WindowStatistics::CentroidSpread { increase, decrease } => {
            format!("IDs={:.2} DDs={:.2}", increase.spread, decrease.spread)
        }
        WindowStatistics::DistanceAngle {
            track,
            increase,
            decrease,
        } => format!(
            "IDs={:.2} DDs={:.2} TD={:.0} TV={} ID={:.0} IV={} DD={:.0} DV={}",
            increase.distance_std,
            decrease.distance_std,
            track.distance,
            track.direction,
            increase.cue.distance,
            increase.cue.direction,
            decrease.cue.distance,
            decrease.cue.direction
        ),
    }
}
