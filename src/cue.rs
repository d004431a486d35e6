//! Cue collaborators and offset capture
//!
//! Cues are owned elsewhere (a renderer, an animation stepper); the engine only
//! reads their current location. [`CuePair::capture`] turns a raw gaze sample
//! into an [`OffsetSample`] using the geometry at that instant.

use crate::types::{CueKind, OffsetSample, Point, Sample};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Read-only view of an on-screen cue
pub trait Cue: Send + Sync {
    /// Current location of the cue (screen pixels)
    fn location(&self) -> Point;

    /// Centre of the cue's visual; defaults to its location
    fn center(&self) -> Point {
        self.location()
    }
}

/// A cue that never moves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticCue {
    location: Point,
}

impl StaticCue {
    pub fn new(location: Point) -> Self {
        Self { location }
    }
}

impl Cue for StaticCue {
    fn location(&self) -> Point {
        self.location
    }
}

/// A cue whose location is updated by an external stepper.
///
/// Clones share the same location, so the animation side keeps one handle
/// and the detector another.
#[derive(Debug, Clone, Default)]
pub struct TrackedCue {
    location: Arc<RwLock<Point>>,
}

impl TrackedCue {
    pub fn new(location: Point) -> Self {
        Self {
            location: Arc::new(RwLock::new(location)),
        }
    }

    /// Move the cue
    pub fn set_location(&self, location: Point) {
        match self.location.write() {
            Ok(mut guard) => *guard = location,
            Err(poisoned) => *poisoned.into_inner() = location,
        }
    }
}

impl Cue for TrackedCue {
    fn location(&self) -> Point {
        match self.location.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// The two competing cues
pub struct CuePair {
    increase: Box<dyn Cue>,
    decrease: Box<dyn Cue>,
}

impl CuePair {
    pub fn new(increase: impl Cue + 'static, decrease: impl Cue + 'static) -> Self {
        Self {
            increase: Box::new(increase),
            decrease: Box::new(decrease),
        }
    }

    pub fn get(&self, kind: CueKind) -> &dyn Cue {
        match kind {
            CueKind::Increase => self.increase.as_ref(),
            CueKind::Decrease => self.decrease.as_ref(),
        }
    }

    /// Capture a sample's offsets to both cues at their current locations
    pub fn capture(&self, sample: Sample) -> OffsetSample {
        OffsetSample {
            sample,
            offset_increase: sample.location - self.increase.location(),
            offset_decrease: sample.location - self.decrease.location(),
        }
    }
}

impl fmt::Debug for CuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuePair")
            .field("increase", &self.increase.location())
            .field("decrease", &self.decrease.location())
            .finish()
    }
}
