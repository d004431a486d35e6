//! Per-cue movement statistics over a sample window
//!
//! Two interchangeable strategies summarise how stable the gaze-to-cue offset
//! was across the window:
//!
//! - **Centroid spread**: RMS distance of each 2D offset from the mean offset.
//! - **Distance/angle**: mean and STD of the scalar offset distance, plus the
//!   net displacement of the gaze track and of each cue between the oldest and
//!   newest sample.
//!
//! Statistics are recomputed from scratch every time the window changes; the
//! window holds a few dozen samples at most.

use crate::angle::AngleTracker;
use crate::types::{CueKind, OffsetSample, Point};
use crate::window::SampleWindow;
use serde::{Deserialize, Serialize};

/// STD reported when there is not enough data to judge stability
pub const UNSTABLE_STD: f64 = 1_000_000.0;

/// Which statistics strategy a detector runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsStrategy {
    /// 2D spread of offsets around their centroid (small wobble cues)
    CentroidSpread,
    /// Scalar offset distance plus displacement ground truth (moving cues)
    #[default]
    DistanceAngle,
}

impl StatisticsStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsStrategy::CentroidSpread => "centroid_spread",
            StatisticsStrategy::DistanceAngle => "distance_angle",
        }
    }
}

/// Running scalar series with mean and population standard deviation
#[derive(Debug, Clone, Default)]
pub struct Series {
    values: Vec<f64>,
    sum: f64,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
        self.sum += value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    /// Population STD; [`UNSTABLE_STD`] with fewer than two values
    pub fn std(&self) -> f64 {
        if self.values.len() < 2 {
            return UNSTABLE_STD;
        }
        let mean = self.mean();
        let square_sum: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        sanitize_std((square_sum / self.values.len() as f64).sqrt())
    }
}

fn sanitize_std(std: f64) -> f64 {
    if std.is_finite() {
        std
    } else {
        UNSTABLE_STD
    }
}

/// Net displacement between two points
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Straight-line distance travelled (pixels)
    pub distance: f64,
    /// Displacement vector `last - first`
    pub direction: Point,
}

impl Movement {
    pub fn between(first: Point, last: Point) -> Self {
        let direction = last - first;
        Self {
            distance: direction.length(),
            direction,
        }
    }

    /// Displacement of the raw gaze track
    pub fn of_track(first: &OffsetSample, last: &OffsetSample) -> Self {
        Self::between(first.location(), last.location())
    }

    /// Displacement of a cue, reconstructed as gaze minus offset
    pub fn of_cue(first: &OffsetSample, last: &OffsetSample, kind: CueKind) -> Self {
        Self::between(first.cue_location(kind), last.cue_location(kind))
    }
}

/// Centroid-spread statistics for one cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadStats {
    /// Mean offset vector over the window
    pub mean_offset: Point,
    /// RMS distance of offsets from `mean_offset`
    pub spread: f64,
}

impl SpreadStats {
    pub fn compute(offsets: &[Point]) -> Self {
        let sum = offsets.iter().fold(Point::ORIGIN, |sum, o| sum + *o);
        if offsets.len() < 2 {
            return Self {
                mean_offset: sum,
                spread: UNSTABLE_STD,
            };
        }

        let n = offsets.len() as f64;
        let mean_offset = Point::new(sum.x / n, sum.y / n);
        let square_sum: f64 = offsets
            .iter()
            .map(|o| {
                let d = *o - mean_offset;
                d.x * d.x + d.y * d.y
            })
            .sum();

        Self {
            mean_offset,
            spread: sanitize_std((square_sum / n).sqrt()),
        }
    }
}

/// Distance/angle statistics for one cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceStats {
    pub distance_mean: f64,
    pub distance_std: f64,
    /// Mean offset angle in degrees (only when angle tracking is on)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle_mean_deg: Option<f64>,
    /// Offset angle STD in degrees (only when angle tracking is on)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle_std_deg: Option<f64>,
    /// How far the cue itself moved across the window
    pub cue: Movement,
}

/// Continuity state for offset angles, one tracker per cue
#[derive(Debug, Clone, Default)]
pub struct CueAngleTrackers {
    pub increase: AngleTracker,
    pub decrease: AngleTracker,
}

impl CueAngleTrackers {
    pub fn get_mut(&mut self, kind: CueKind) -> &mut AngleTracker {
        match kind {
            CueKind::Increase => &mut self.increase,
            CueKind::Decrease => &mut self.decrease,
        }
    }

    pub fn reset(&mut self) {
        self.increase.reset();
        self.decrease.reset();
    }
}

impl DistanceStats {
    fn compute(
        window: &SampleWindow<OffsetSample>,
        kind: CueKind,
        first: &OffsetSample,
        last: &OffsetSample,
        angles: Option<&mut AngleTracker>,
    ) -> Self {
        let mut distances = Series::new();
        for sample in window.iter() {
            distances.push(sample.offset(kind).length());
        }

        let (angle_mean_deg, angle_std_deg) = match angles {
            Some(tracker) => {
                let mut series = Series::new();
                for sample in window.iter() {
                    let offset = sample.offset(kind);
                    series.push(tracker.track(offset.x, offset.y).degrees());
                }
                (Some(series.mean()), Some(series.std()))
            }
            None => (None, None),
        };

        Self {
            distance_mean: distances.mean(),
            distance_std: distances.std(),
            angle_mean_deg,
            angle_std_deg,
            cue: Movement::of_cue(first, last, kind),
        }
    }
}

fn offsets(window: &SampleWindow<OffsetSample>, kind: CueKind) -> Vec<Point> {
    window.iter().map(|s| s.offset(kind)).collect()
}

/// Statistics for both cues over one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WindowStatistics {
    CentroidSpread {
        increase: SpreadStats,
        decrease: SpreadStats,
    },
    DistanceAngle {
        /// Net displacement of the gaze itself
        track: Movement,
        increase: DistanceStats,
        decrease: DistanceStats,
    },
}

impl WindowStatistics {
    /// Compute statistics for the window contents.
    ///
    /// Returns `None` for an empty window. `angles` is only consulted by the
    /// distance/angle strategy.
    pub fn compute(
        strategy: StatisticsStrategy,
        window: &SampleWindow<OffsetSample>,
        angles: Option<&mut CueAngleTrackers>,
    ) -> Option<Self> {
        let first = window.peek_oldest()?;
        let last = window.peek_newest()?;

        let stats = match strategy {
            StatisticsStrategy::CentroidSpread => WindowStatistics::CentroidSpread {
                increase: SpreadStats::compute(&offsets(window, CueKind::Increase)),
                decrease: SpreadStats::compute(&offsets(window, CueKind::Decrease)),
            },
            StatisticsStrategy::DistanceAngle => {
                let (increase_angles, decrease_angles) = match angles {
                    Some(trackers) => (Some(&mut trackers.increase), Some(&mut trackers.decrease)),
                    None => (None, None),
                };
                WindowStatistics::DistanceAngle {
                    track: Movement::of_track(first, last),
                    increase: DistanceStats::compute(
                        window,
                        CueKind::Increase,
                        first,
                        last,
                        increase_angles,
                    ),
                    decrease: DistanceStats::compute(
                        window,
                        CueKind::Decrease,
                        first,
                        last,
                        decrease_angles,
                    ),
                }
            }
        };

        Some(stats)
    }

    pub fn strategy(&self) -> StatisticsStrategy {
        match self {
            WindowStatistics::CentroidSpread { .. } => StatisticsStrategy::CentroidSpread,
            WindowStatistics::DistanceAngle { .. } => StatisticsStrategy::DistanceAngle,
        }
    }

    /// Offset instability for a cue: spread or distance STD
    pub fn offset_std(&self, kind: CueKind) -> f64 {
        match (self, kind) {
            (WindowStatistics::CentroidSpread { increase, .. }, CueKind::Increase) => {
                increase.spread
            }
            (WindowStatistics::CentroidSpread { decrease, .. }, CueKind::Decrease) => {
                decrease.spread
            }
            (WindowStatistics::DistanceAngle { increase, .. }, CueKind::Increase) => {
                increase.distance_std
            }
            (WindowStatistics::DistanceAngle { decrease, .. }, CueKind::Decrease) => {
                decrease.distance_std
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::types::Sample;

    fn window_of(samples: &[(i64, Point, Point, Point)]) -> SampleWindow<OffsetSample> {
        let mut window = SampleWindow::new(10_000);
        for &(ts, gaze, increase, decrease) in samples {
            window.push(OffsetSample {
                sample: Sample::new(ts, gaze),
                offset_increase: gaze - increase,
                offset_decrease: gaze - decrease,
            });
        }
        window
    }

    #[test]
    fn test_series_mean_and_std() {
        let mut series = Series::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            series.push(v);
        }
        assert!((series.mean() - 5.0).abs() < 1e-12);
        assert!((series.std() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_series_sentinel_below_two_values() {
        let mut series = Series::new();
        assert_eq!(series.std(), UNSTABLE_STD);
        assert_eq!(series.mean(), 0.0);
        series.push(3.0);
        assert_eq!(series.std(), UNSTABLE_STD);
        assert_eq!(series.mean(), 3.0);
    }

    #[test]
    fn test_spread_of_constant_offsets_is_zero() {
        let offsets = vec![Point::new(3.0, 4.0); 5];
        let stats = SpreadStats::compute(&offsets);
        assert_eq!(stats.mean_offset, Point::new(3.0, 4.0));
        assert_eq!(stats.spread, 0.0);
    }

    #[test]
    fn test_spread_is_rms_from_centroid() {
        let offsets = vec![
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, -1.0),
        ];
        let stats = SpreadStats::compute(&offsets);
        assert_eq!(stats.mean_offset, Point::ORIGIN);
        assert!((stats.spread - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spread_single_offset_is_unstable() {
        let stats = SpreadStats::compute(&[Point::new(2.0, 2.0)]);
        assert_eq!(stats.spread, UNSTABLE_STD);
    }

    #[test]
    fn test_distance_angle_track_and_cue_movement() {
        let decrease = Point::new(0.0, 0.0);
        let window = window_of(&[
            (0, Point::new(100.0, 105.0), Point::new(100.0, 100.0), decrease),
            (30, Point::new(130.0, 105.0), Point::new(130.0, 100.0), decrease),
            (60, Point::new(160.0, 105.0), Point::new(160.0, 100.0), decrease),
        ]);

        let stats =
            WindowStatistics::compute(StatisticsStrategy::DistanceAngle, &window, None).unwrap();
        match stats {
            WindowStatistics::DistanceAngle {
                track,
                increase,
                decrease,
            } => {
                assert!((track.distance - 60.0).abs() < 1e-9);
                assert_eq!(track.direction, Point::new(60.0, 0.0));
                assert!((increase.distance_mean - 5.0).abs() < 1e-9);
                assert!(increase.distance_std.abs() < 1e-9);
                assert!((increase.cue.distance - 60.0).abs() < 1e-9);
                assert_eq!(decrease.cue.distance, 0.0);
                assert!(decrease.distance_std > 1.0);
                assert!(increase.angle_std_deg.is_none());
            }
            other => panic!("unexpected strategy: {:?}", other),
        }
    }

    #[test]
    fn test_angle_tracking_reports_degrees() {
        let decrease = Point::new(500.0, 500.0);
        let cue = Point::new(100.0, 100.0);
        let window = window_of(&[
            (0, Point::new(110.0, 100.0), cue, decrease),
            (30, Point::new(100.0, 110.0), cue, decrease),
        ]);
        let mut trackers = CueAngleTrackers::default();

        let stats = WindowStatistics::compute(
            StatisticsStrategy::DistanceAngle,
            &window,
            Some(&mut trackers),
        )
        .unwrap();
        let WindowStatistics::DistanceAngle { increase, .. } = stats else {
            panic!("expected distance/angle statistics");
        };
        // Offsets at 0° and 90°
        assert!((increase.angle_mean_deg.unwrap() - 45.0).abs() < 1e-9);
        assert!((increase.angle_std_deg.unwrap() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window_has_no_statistics() {
        let window: SampleWindow<OffsetSample> = SampleWindow::new(600);
        assert!(
            WindowStatistics::compute(StatisticsStrategy::CentroidSpread, &window, None).is_none()
        );
    }

    #[test]
    fn test_offset_std_selects_strategy_metric() {
        let window = window_of(&[
            (0, Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
            (30, Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(-10.0, 0.0)),
        ]);
        let spread =
            WindowStatistics::compute(StatisticsStrategy::CentroidSpread, &window, None).unwrap();
        assert_eq!(spread.strategy(), StatisticsStrategy::CentroidSpread);
        assert_eq!(spread.offset_std(CueKind::Increase), 0.0);
        assert!((spread.offset_std(CueKind::Decrease) - 10.0).abs() < 1e-9);

        // Same distances, opposite sides: distance STD cannot see the difference
        let dist =
            WindowStatistics::compute(StatisticsStrategy::DistanceAngle, &window, None).unwrap();
        assert_eq!(dist.offset_std(CueKind::Decrease), 0.0);
    }
}
