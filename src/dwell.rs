//! Dwell classifier
//!
//! Each cue gets a square responsive area around its centre. Every gaze tick
//! inside an area adds one sample interval to that area's accumulator, every
//! tick outside subtracts one. An area is activated while its accumulator is at
//! least the dwell time; the accumulator is capped at dwell time plus
//! hysteresis so leaving the area deactivates it after a bounded delay.

use crate::config::DwellConfig;
use crate::types::{CueKind, Point, Rect, State};
use serde::{Deserialize, Serialize};

/// One responsive area with its accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellArea {
    pub rect: Rect,
    accumulated_ms: i64,
    dwell_time_ms: i64,
    max_ms: i64,
}

impl DwellArea {
    pub fn new(center: Point, config: &DwellConfig) -> Self {
        Self {
            rect: Rect::centered_square(center, config.area_size_px),
            accumulated_ms: 0,
            dwell_time_ms: config.dwell_time_ms,
            max_ms: config.max_accumulated_ms(),
        }
    }

    /// Account one tick of `interval_ms` at `point`
    pub fn feed(&mut self, point: Point, interval_ms: i64) {
        let step = if self.rect.contains(point) {
            interval_ms
        } else {
            -interval_ms
        };
        self.accumulated_ms = (self.accumulated_ms + step).min(self.max_ms).max(0);
    }

    pub fn is_activated(&self) -> bool {
        self.accumulated_ms >= self.dwell_time_ms
    }

    pub fn accumulated_ms(&self) -> i64 {
        self.accumulated_ms
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
    }
}

/// Classifies gaze ticks by dwell on the two cue areas
#[derive(Debug, Clone)]
pub struct DwellClassifier {
    increase: DwellArea,
    decrease: DwellArea,
    interval_ms: i64,
}

impl DwellClassifier {
    pub fn new(
        increase_center: Point,
        decrease_center: Point,
        interval_ms: i64,
        config: &DwellConfig,
    ) -> Self {
        Self {
            increase: DwellArea::new(increase_center, config),
            decrease: DwellArea::new(decrease_center, config),
            interval_ms,
        }
    }

    pub fn area(&self, kind: CueKind) -> &DwellArea {
        match kind {
            CueKind::Increase => &self.increase,
            CueKind::Decrease => &self.decrease,
        }
    }

    /// Feed one gaze tick to both areas and return the resulting state.
    ///
    /// Increase wins when both areas are active (only possible when they
    /// overlap).
    pub fn classify(&mut self, point: Point) -> State {
        self.increase.feed(point, self.interval_ms);
        self.decrease.feed(point, self.interval_ms);

        if self.increase.is_activated() {
            State::Increase
        } else if self.decrease.is_activated() {
            State::Decrease
        } else {
            State::Unknown
        }
    }

    pub fn reset(&mut self) {
        self.increase.reset();
        self.decrease.reset();
    }
}
