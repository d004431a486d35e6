//! Gaze trace schema and replay
//!
//! A trace is a recorded session: gaze samples, cue positions and session
//! control events, one JSON object per line (NDJSON) or as a JSON array.
//! Replaying a trace through a [`GazeDetector`] reproduces the direction
//! events a live session would have produced.
//!
//! ```text
//! {"type":"cues","increase":{"x":200,"y":300},"decrease":{"x":400,"y":500}}
//! {"type":"start"}
//! {"type":"sample","timestamp_ms":0,"gaze":{"x":201,"y":299},"increase":{"x":200,"y":300}}
//! {"type":"raw","timestamp_ms":25,"gaze":{"x":205,"y":301}}
//! {"type":"tick","increase":{"x":210,"y":300}}
//! {"type":"saccade"}
//! {"type":"stop"}
//! ```
//!
//! `raw` events are queued and averaged into one sample on the next `tick`,
//! the way a timer-driven tracker integration delivers them.

use crate::aggregate::SampleAggregator;
use crate::config::DetectorConfig;
use crate::cue::{CuePair, TrackedCue};
use crate::detector::{Detection, GazeDetector, SessionSummary};
use crate::error::PursuitError;
use crate::types::{Direction, Point, Sample, State};
use serde::{Deserialize, Serialize};

/// Current trace format identifier
pub const TRACE_SCHEMA_VERSION: &str = "gaze.trace.v1";

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Place both cues without feeding a sample
    Cues { increase: Point, decrease: Point },
    Start,
    Stop,
    Reset,
    Saccade,
    /// A pre-aggregated gaze sample, with cue positions at capture time
    Sample {
        timestamp_ms: i64,
        gaze: Point,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        increase: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decrease: Option<Point>,
    },
    /// A raw tracker point, queued until the next tick
    Raw { timestamp_ms: i64, gaze: Point },
    /// Flush queued raw points as one sample
    Tick {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        increase: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decrease: Option<Point>,
    },
}

impl TraceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEvent::Cues { .. } => "cues",
            TraceEvent::Start => "start",
            TraceEvent::Stop => "stop",
            TraceEvent::Reset => "reset",
            TraceEvent::Saccade => "saccade",
            TraceEvent::Sample { .. } => "sample",
            TraceEvent::Raw { .. } => "raw",
            TraceEvent::Tick { .. } => "tick",
        }
    }

    /// Whether this event delivers gaze data to the detector
    pub fn feeds(&self) -> bool {
        matches!(
            self,
            TraceEvent::Sample { .. } | TraceEvent::Raw { .. } | TraceEvent::Tick { .. }
        )
    }

    /// Check coordinates and timestamps
    pub fn validate(&self) -> Result<(), String> {
        let points: Vec<(&str, Point)> = match self {
            TraceEvent::Cues { increase, decrease } => {
                vec![("increase", *increase), ("decrease", *decrease)]
            }
            TraceEvent::Sample {
                gaze,
                increase,
                decrease,
                ..
            } => {
                let mut points = vec![("gaze", *gaze)];
                points.extend(increase.map(|p| ("increase", p)));
                points.extend(decrease.map(|p| ("decrease", p)));
                points
            }
            TraceEvent::Raw { gaze, .. } => vec![("gaze", *gaze)],
            TraceEvent::Tick { increase, decrease } => increase
                .map(|p| ("increase", p))
                .into_iter()
                .chain(decrease.map(|p| ("decrease", p)))
                .collect(),
            TraceEvent::Start | TraceEvent::Stop | TraceEvent::Reset | TraceEvent::Saccade => {
                Vec::new()
            }
        };

        for (name, point) in points {
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(format!("{} has a non-finite coordinate", name));
            }
        }

        match self {
            TraceEvent::Sample { timestamp_ms, .. } | TraceEvent::Raw { timestamp_ms, .. }
                if *timestamp_ms < 0 =>
            {
                Err(format!("negative timestamp {}", timestamp_ms))
            }
            _ => Ok(()),
        }
    }
}

/// A rejected trace event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub index: usize,
    pub kind: String,
    pub reason: String,
}

/// Parse a JSON array of events
pub fn parse_array(json: &str) -> Result<Vec<TraceEvent>, PursuitError> {
    let events: Vec<TraceEvent> = serde_json::from_str(json)?;
    Ok(events)
}

/// Parse NDJSON, skipping blank lines
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TraceEvent>, PursuitError> {
    let mut events = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<TraceEvent>(trimmed) {
            Ok(event) => events.push(event),
            Err(e) => {
                return Err(PursuitError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(events)
}

/// Parse either format, deciding by the first non-blank character
pub fn parse_trace(input: &str) -> Result<Vec<TraceEvent>, PursuitError> {
    if input.trim_start().starts_with('[') {
        parse_array(input)
    } else {
        parse_ndjson(input)
    }
}

/// Collect every invalid event
pub fn validate_events(events: &[TraceEvent]) -> Vec<ValidationIssue> {
    events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| {
            event.validate().err().map(|reason| ValidationIssue {
                index,
                kind: event.kind().to_string(),
                reason,
            })
        })
        .collect()
}

/// One classified sample in replay output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub timestamp_ms: i64,
    pub state: State,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    pub value: f64,
    pub duration_ms: i64,
}

impl From<&Detection> for ReplayRecord {
    fn from(detection: &Detection) -> Self {
        Self {
            timestamp_ms: detection.timestamp_ms,
            state: detection.state,
            direction: detection.direction(),
            value: detection.value,
            duration_ms: detection.duration_ms,
        }
    }
}

/// Everything a replay produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub schema_version: String,
    pub records: Vec<ReplayRecord>,
    pub sessions: Vec<SessionSummary>,
}

impl ReplayReport {
    /// Count of records per direction as `(increase, decrease)`
    pub fn direction_counts(&self) -> (usize, usize) {
        self.records
            .iter()
            .fold((0, 0), |(inc, dec), r| match r.direction {
                Some(Direction::Increase) => (inc + 1, dec),
                Some(Direction::Decrease) => (inc, dec + 1),
                None => (inc, dec),
            })
    }
}

/// Drives a detector from trace events
#[derive(Debug)]
pub struct TraceReplayer {
    detector: GazeDetector,
    increase: TrackedCue,
    decrease: TrackedCue,
    aggregator: SampleAggregator,
}

impl TraceReplayer {
    pub fn new(config: DetectorConfig) -> Result<Self, PursuitError> {
        let increase = TrackedCue::default();
        let decrease = TrackedCue::default();
        let detector =
            GazeDetector::new(config, CuePair::new(increase.clone(), decrease.clone()))?;
        Ok(Self {
            detector,
            increase,
            decrease,
            aggregator: SampleAggregator::new(),
        })
    }

    pub fn detector(&self) -> &GazeDetector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut GazeDetector {
        &mut self.detector
    }

    fn place_cues(&self, increase: Option<Point>, decrease: Option<Point>) {
        if let Some(p) = increase {
            self.increase.set_location(p);
        }
        if let Some(p) = decrease {
            self.decrease.set_location(p);
        }
    }

    /// Apply one event; returns a detection for events that reached the classifier
    pub fn apply(
        &mut self,
        event: &TraceEvent,
        sessions: &mut Vec<SessionSummary>,
    ) -> Option<Detection> {
        match event {
            TraceEvent::Cues { increase, decrease } => {
                self.place_cues(Some(*increase), Some(*decrease));
                None
            }
            TraceEvent::Start => {
                sessions.extend(self.detector.stop());
                self.aggregator = SampleAggregator::new();
                self.detector.start();
                None
            }
            TraceEvent::Stop => {
                sessions.extend(self.detector.stop());
                None
            }
            TraceEvent::Reset => {
                self.detector.reset();
                None
            }
            TraceEvent::Saccade => {
                self.detector.on_saccade();
                None
            }
            TraceEvent::Sample {
                timestamp_ms,
                gaze,
                increase,
                decrease,
            } => {
                self.place_cues(*increase, *decrease);
                self.detector.feed(*timestamp_ms, *gaze)
            }
            TraceEvent::Raw { timestamp_ms, gaze } => {
                self.aggregator.push(Sample::new(*timestamp_ms, *gaze));
                None
            }
            TraceEvent::Tick { increase, decrease } => {
                self.place_cues(*increase, *decrease);
                let sample = self.aggregator.flush()?;
                self.detector.feed(sample.timestamp_ms, sample.location)
            }
        }
    }

    /// Validate and replay a whole trace.
    ///
    /// Traces without any `start` event are started implicitly before the
    /// first gaze event. A session still running at the end is stopped so its
    /// summary is included.
    pub fn replay(&mut self, events: &[TraceEvent]) -> Result<ReplayReport, PursuitError> {
        if let Some(issue) = validate_events(events).into_iter().next() {
            return Err(PursuitError::InvalidEvent {
                index: issue.index,
                reason: issue.reason,
            });
        }

        let mut auto_start = !events.iter().any(|e| matches!(e, TraceEvent::Start));
        let mut records = Vec::new();
        let mut sessions = Vec::new();

        for event in events {
            if auto_start && event.feeds() {
                self.detector.start();
                auto_start = false;
            }
            if let Some(detection) = self.apply(event, &mut sessions) {
                records.push(ReplayRecord::from(&detection));
            }
        }

        sessions.extend(self.detector.stop());

        Ok(ReplayReport {
            schema_version: TRACE_SCHEMA_VERSION.to_string(),
            records,
            sessions,
        })
    }
}

/// Parse and replay a trace with the given configuration
pub fn replay_trace(input: &str, config: DetectorConfig) -> Result<ReplayReport, PursuitError> {
    let events = parse_trace(input)?;
    TraceReplayer::new(config)?.replay(&events)
}
