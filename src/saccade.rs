//! Saccade detection on the incoming gaze stream
//!
//! Points are smoothed against the previous smoothed point with
//! `(p + α·last) / (1 + α)`. A jump of more than the minimum fixation distance
//! between consecutive smoothed points is reported as a saccade. The smoothed
//! point is kept either way, so a saccade is followed by a short catch-up.

use crate::config::SaccadeConfig;
use crate::types::Point;

#[derive(Debug, Clone)]
pub struct SaccadeFilter {
    min_fixation_distance_px: f64,
    alpha: f64,
    last: Option<Point>,
}

impl SaccadeFilter {
    pub fn new(config: &SaccadeConfig) -> Self {
        Self {
            min_fixation_distance_px: config.min_fixation_distance_px,
            alpha: config.smoothing_alpha,
            last: None,
        }
    }

    /// Feed a point; returns `true` if it starts a new fixation after a saccade
    pub fn observe(&mut self, point: Point) -> bool {
        let Some(last) = self.last else {
            self.last = Some(point);
            return false;
        };

        let smoothed = Point::new(
            (point.x + self.alpha * last.x) / (1.0 + self.alpha),
            (point.y + self.alpha * last.y) / (1.0 + self.alpha),
        );

        self.last = Some(smoothed);
        smoothed.distance_to(last) > self.min_fixation_distance_px
    }

    /// Last smoothed point
    pub fn last(&self) -> Option<Point> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
