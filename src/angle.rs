//! Continuous angles
//!
//! `atan2` is wrapped to (-π, π], so a gaze offset circling a cue would jump
//! by a full turn whenever it crosses the branch cut. [`AngleTracker`] keeps a
//! running cycle offset and the last emitted angle so that successive angles
//! form a continuous trajectory. The tracker is owned by whoever needs the
//! continuity and is reset with its session.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// An angle that stays continuous across the -π/π boundary.
///
/// `radians` stays reduced (as produced by `atan2`); the unwrapped value is
/// `radians + cycles * 2π`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousAngle {
    pub radians: f64,
    pub cycles: i32,
}

impl ContinuousAngle {
    pub fn new(radians: f64, cycles: i32) -> Self {
        Self { radians, cycles }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::new(degrees.to_radians(), 0)
    }

    /// The true, unwrapped angle in radians
    pub fn unwrapped(&self) -> f64 {
        self.radians + self.cycles as f64 * TAU
    }

    /// The unwrapped angle in degrees
    pub fn degrees(&self) -> f64 {
        self.unwrapped().to_degrees()
    }

    /// Add `n` full cycles
    pub fn rotate_by(mut self, n: i32) -> Self {
        self.cycles += n;
        self
    }

    /// Shift by one cycle when the raw difference from `reference` exceeds ±π.
    ///
    /// `cycle_offset` is the running offset of the owning tracker and is
    /// adjusted by the same amount.
    pub fn keep_close_to(mut self, reference: &ContinuousAngle, cycle_offset: &mut i32) -> Self {
        let diff = self.unwrapped() - reference.unwrapped();
        if diff > PI {
            self.cycles -= 1;
            *cycle_offset -= 1;
        } else if diff < -PI {
            self.cycles += 1;
            *cycle_offset += 1;
        }
        self
    }

    /// `a - b`, normalized into the open interval (-2π, 2π).
    ///
    /// This is a displacement, not an absolute angle, so it is not folded
    /// into (-π, π].
    pub fn difference(a: &ContinuousAngle, b: &ContinuousAngle) -> ContinuousAngle {
        let mut radians = a.unwrapped() - b.unwrapped();
        if !radians.is_finite() {
            return ContinuousAngle::default();
        }
        while radians >= TAU {
            radians -= TAU;
        }
        while radians <= -TAU {
            radians += TAU;
        }
        ContinuousAngle::new(radians, 0)
    }
}

impl fmt::Display for ContinuousAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D: {:.1}, R: {:.3}", self.degrees(), self.unwrapped())
    }
}

/// Continuity state for a sequence of angles computed from vectors
#[derive(Debug, Clone, Default)]
pub struct AngleTracker {
    cycle_offset: i32,
    last: ContinuousAngle,
}

impl AngleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Angle of the vector `(dx, dy)`, kept continuous with the previous one.
    ///
    /// `(0, 0)` yields `atan2(0, 0) = 0` before continuity is applied.
    pub fn track(&mut self, dx: f64, dy: f64) -> ContinuousAngle {
        let raw = dy.atan2(dx);
        let raw = if raw.is_finite() { raw } else { 0.0 };

        let angle = ContinuousAngle::new(raw, 0)
            .rotate_by(self.cycle_offset)
            .keep_close_to(&self.last, &mut self.cycle_offset);
        self.last = angle;
        angle
    }

    pub fn last(&self) -> ContinuousAngle {
        self.last
    }

    pub fn cycle_offset(&self) -> i32 {
        self.cycle_offset
    }

    /// Forget all continuity state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sweep(tracker: &mut AngleTracker, start: f64, step: f64, count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| {
                let theta = start + step * i as f64;
                tracker.track(theta.cos(), theta.sin()).unwrapped()
            })
            .collect()
    }

    #[test]
    fn test_counterclockwise_sweep_through_branch_cut_is_monotonic() {
        let mut tracker = AngleTracker::new();
        let step = 0.1;
        let angles = sweep(&mut tracker, 2.8, step, 20);

        for pair in angles.windows(2) {
            let delta = pair[1] - pair[0];
            assert!(delta > 0.0, "angle went backwards: {:?}", pair);
            assert!((delta - step).abs() < 1e-9, "jump of {} rad", delta);
        }
        assert_eq!(tracker.cycle_offset(), 1);
    }

    #[test]
    fn test_clockwise_sweep_through_branch_cut_is_monotonic() {
        let mut tracker = AngleTracker::new();
        let step = -0.15;
        let angles = sweep(&mut tracker, -2.7, step, 30);

        for pair in angles.windows(2) {
            let delta = pair[1] - pair[0];
            assert!(delta < 0.0);
            assert!((delta - step).abs() < 1e-9);
        }
        assert_eq!(tracker.cycle_offset(), -1);
    }

    #[test]
    fn test_multiple_turns_accumulate_cycles() {
        let mut tracker = AngleTracker::new();
        let angles = sweep(&mut tracker, 0.0, 0.5, 40);
        let total = angles.last().unwrap() - angles.first().unwrap();
        assert!((total - 0.5 * 39.0).abs() < 1e-9);
        assert_eq!(tracker.cycle_offset(), 3);
    }

    #[test]
    fn test_zero_vector_is_tolerated() {
        let mut tracker = AngleTracker::new();
        let angle = tracker.track(0.0, 0.0);
        assert_eq!(angle.unwrapped(), 0.0);
    }

    #[test]
    fn test_reset_clears_continuity() {
        let mut tracker = AngleTracker::new();
        sweep(&mut tracker, 2.8, 0.1, 10);
        assert_ne!(tracker.cycle_offset(), 0);

        tracker.reset();
        assert_eq!(tracker.cycle_offset(), 0);
        assert_eq!(tracker.last(), ContinuousAngle::default());
    }

    #[test]
    fn test_rotate_by_tracks_cycles() {
        let angle = ContinuousAngle::new(1.0, 0).rotate_by(2);
        assert_eq!(angle.cycles, 2);
        assert!((angle.unwrapped() - (1.0 + 2.0 * TAU)).abs() < 1e-12);
        assert_eq!(angle.radians, 1.0);
    }

    #[test]
    fn test_difference_normalizes_into_open_double_turn() {
        let a = ContinuousAngle::new(0.5, 2);
        let b = ContinuousAngle::new(0.2, 0);
        let d = ContinuousAngle::difference(&a, &b);
        assert!((d.radians - 0.3).abs() < 1e-9);

        // Displacements between π and 2π are kept as-is
        let a = ContinuousAngle::new(3.0, 0);
        let b = ContinuousAngle::new(-2.0, 0);
        let d = ContinuousAngle::difference(&a, &b);
        assert!((d.radians - 5.0).abs() < 1e-9);

        let d = ContinuousAngle::difference(&b, &a);
        assert!((d.radians + 5.0).abs() < 1e-9);
        assert!(d.radians > -TAU && d.radians < TAU);
    }

    #[test]
    fn test_degrees_and_display() {
        let angle = ContinuousAngle::from_degrees(90.0);
        assert!((angle.degrees() - 90.0).abs() < 1e-9);
        assert_eq!(angle.to_string(), "D: 90.0, R: 1.571");
    }
}
