//! Core types for the gaze pursuit engine
//!
//! This module defines the geometry and sample structures that flow through the
//! engine: screen points, gaze samples, per-cue offset samples, and the
//! classification states emitted for each sample.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point (or displacement vector) in screen pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length when the point is read as a vector
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f64 {
        (other - *self).length()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0},{:.0}", self.x, self.y)
    }
}

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Square of side `size` centred on `center`
    pub fn centered_square(center: Point, size: f64) -> Self {
        let half = size / 2.0;
        Self::new(center.x - half, center.y - half, size, size)
    }

    /// Half-open containment: left/top edges inside, right/bottom edges outside
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.x < self.left + self.width
            && p.y >= self.top
            && p.y < self.top + self.height
    }
}

/// One of the two competing cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    Increase,
    Decrease,
}

impl CueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::Increase => "increase",
            CueKind::Decrease => "decrease",
        }
    }

    pub fn other(&self) -> CueKind {
        match self {
            CueKind::Increase => CueKind::Decrease,
            CueKind::Decrease => CueKind::Increase,
        }
    }
}

/// Classification state for a single sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Unknown,
    Increase,
    Decrease,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Unknown => "unknown",
            State::Increase => "increase",
            State::Decrease => "decrease",
        }
    }

    /// Direction event implied by this state, if any
    pub fn direction(&self) -> Option<Direction> {
        match self {
            State::Unknown => None,
            State::Increase => Some(Direction::Increase),
            State::Decrease => Some(Direction::Decrease),
        }
    }
}

impl From<CueKind> for State {
    fn from(kind: CueKind) -> Self {
        match kind {
            CueKind::Increase => State::Increase,
            CueKind::Decrease => State::Decrease,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value-change direction delivered to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// Signed unit step for this direction
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Increase => 1.0,
            Direction::Decrease => -1.0,
        }
    }
}

/// Timestamped sample held by a [`SampleWindow`](crate::window::SampleWindow)
pub trait Timestamped {
    fn timestamp_ms(&self) -> i64;
}

/// A gaze sample as delivered by the external source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Capture time (milliseconds)
    pub timestamp_ms: i64,
    /// Gaze location (screen pixels)
    pub location: Point,
}

impl Sample {
    pub fn new(timestamp_ms: i64, location: Point) -> Self {
        Self {
            timestamp_ms,
            location,
        }
    }
}

impl Timestamped for Sample {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// A gaze sample plus its offsets to both cues, captured at ingestion time.
///
/// Offsets are never recomputed: they reflect the cue geometry at capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetSample {
    pub sample: Sample,
    /// `location - increase_cue.location`
    pub offset_increase: Point,
    /// `location - decrease_cue.location`
    pub offset_decrease: Point,
}

impl OffsetSample {
    pub fn offset(&self, kind: CueKind) -> Point {
        match kind {
            CueKind::Increase => self.offset_increase,
            CueKind::Decrease => self.offset_decrease,
        }
    }

    /// Where the given cue was when this sample was captured
    pub fn cue_location(&self, kind: CueKind) -> Point {
        self.sample.location - self.offset(kind)
    }

    pub fn location(&self) -> Point {
        self.sample.location
    }
}

impl Timestamped for OffsetSample {
    fn timestamp_ms(&self) -> i64 {
        self.sample.timestamp_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 1.0);
        assert_eq!(a - b, Point::new(2.0, 3.0));
        assert_eq!(a + b, Point::new(4.0, 5.0));
        assert!((a.length() - 5.0).abs() < 1e-9);
        assert!((Point::ORIGIN.distance_to(a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_contains_is_half_open() {
        let rect = Rect::centered_square(Point::new(100.0, 100.0), 160.0);
        assert!(rect.contains(Point::new(20.0, 20.0)));
        assert!(rect.contains(Point::new(179.9, 179.9)));
        assert!(!rect.contains(Point::new(180.0, 100.0)));
        assert!(!rect.contains(Point::new(100.0, 180.0)));
        assert!(!rect.contains(Point::new(19.9, 100.0)));
    }

    #[test]
    fn test_offset_sample_recovers_cue_location() {
        let sample = OffsetSample {
            sample: Sample::new(0, Point::new(50.0, 60.0)),
            offset_increase: Point::new(10.0, -5.0),
            offset_decrease: Point::new(-20.0, 0.0),
        };
        assert_eq!(sample.cue_location(CueKind::Increase), Point::new(40.0, 65.0));
        assert_eq!(sample.cue_location(CueKind::Decrease), Point::new(70.0, 60.0));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&State::Increase).unwrap();
        assert_eq!(json, "\"increase\"");
        assert_eq!(State::Decrease.direction(), Some(Direction::Decrease));
        assert_eq!(State::Unknown.direction(), None);
    }
}
