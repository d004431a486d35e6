//! Gaze detector session
//!
//! [`GazeDetector`] is the public entry point. It owns one classification
//! engine (pursuit or dwell), the cue pair, the optional saccade filter and the
//! value control, and turns a stream of `feed(timestamp, point)` calls into
//! direction events.
//!
//! The detector does no locking of its own. Hosts that feed from one thread and
//! reset from another wrap it in a `Mutex`.

use crate::classifier::{Classification, PursuitClassifier};
use crate::config::{DetectorConfig, DetectorMode};
use crate::control::{ValueChange, ValueControl};
use crate::cue::CuePair;
use crate::dwell::DwellClassifier;
use crate::error::PursuitError;
use crate::saccade::SaccadeFilter;
use crate::types::{CueKind, Direction, OffsetSample, Point, Sample, State};
use crate::window::SampleWindow;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Callback invoked once per sample that classifies as Increase or Decrease
pub type DirectionListener = Box<dyn FnMut(Direction) + Send>;

/// Identity of a running session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// Counters accumulated over one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Samples accepted while running
    pub samples: u64,
    /// Samples that produced a classification
    pub classified: u64,
    pub increase_events: u64,
    pub decrease_events: u64,
    /// Explicit resets plus implicit ones from timestamp retreat
    pub resets: u64,
    pub saccades: u64,
    pub final_value: f64,
}

impl SessionSummary {
    fn new(info: &SessionInfo, value: f64) -> Self {
        Self {
            session_id: info.session_id,
            started_at: info.started_at,
            samples: 0,
            classified: 0,
            increase_events: 0,
            decrease_events: 0,
            resets: 0,
            saccades: 0,
            final_value: value,
        }
    }
}

/// Result of feeding one sample that reached the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub timestamp_ms: i64,
    pub state: State,
    /// Window span for pursuit, accumulated dwell time for dwell
    pub duration_ms: i64,
    /// Control value after this sample
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<ValueChange>,
}

impl Detection {
    pub fn direction(&self) -> Option<Direction> {
        self.state.direction()
    }
}

#[derive(Debug)]
enum Engine {
    Pursuit {
        window: SampleWindow<OffsetSample>,
        classifier: PursuitClassifier,
    },
    Dwell {
        window: SampleWindow<Sample>,
        classifier: DwellClassifier,
    },
}

impl Engine {
    fn build(config: &DetectorConfig, cues: &CuePair) -> Self {
        match config.mode {
            DetectorMode::Pursuit => Engine::Pursuit {
                window: SampleWindow::new(config.buffer_duration_ms),
                classifier: PursuitClassifier::new(config.strategy, config.pursuit.clone()),
            },
            DetectorMode::Dwell => Engine::Dwell {
                window: SampleWindow::new(config.buffer_duration_ms),
                classifier: DwellClassifier::new(
                    cues.get(CueKind::Increase).center(),
                    cues.get(CueKind::Decrease).center(),
                    config.sample_interval_ms,
                    &config.dwell,
                ),
            },
        }
    }

    fn reset(&mut self) {
        match self {
            Engine::Pursuit { window, classifier } => {
                window.clear();
                classifier.reset();
            }
            // Accumulators keep their inertia; only a new session zeroes them
            Engine::Dwell { window, .. } => window.clear(),
        }
    }
}

/// Gaze-driven direction detector
pub struct GazeDetector {
    config: DetectorConfig,
    cues: CuePair,
    engine: Engine,
    saccade: Option<SaccadeFilter>,
    control: ValueControl,
    listener: Option<DirectionListener>,
    running: bool,
    last_timestamp_ms: Option<i64>,
    session: Option<SessionSummary>,
    last_classification: Option<Classification>,
}

impl GazeDetector {
    /// Create a stopped detector; call [`start`](Self::start) to arm it
    pub fn new(config: DetectorConfig, cues: CuePair) -> Result<Self, PursuitError> {
        config.validate()?;
        let engine = Engine::build(&config, &cues);
        let saccade = config
            .saccade
            .enabled
            .then(|| SaccadeFilter::new(&config.saccade));
        let control = ValueControl::new(&config.control);

        Ok(Self {
            config,
            cues,
            engine,
            saccade,
            control,
            listener: None,
            running: false,
            last_timestamp_ms: None,
            session: None,
            last_classification: None,
        })
    }

    /// Register the direction-change callback, replacing any previous one
    pub fn set_listener(&mut self, listener: impl FnMut(Direction) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn cues(&self) -> &CuePair {
        &self.cues
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn value(&self) -> f64 {
        self.control.value()
    }

    pub fn control_mut(&mut self) -> &mut ValueControl {
        &mut self.control
    }

    /// Diagnostics of the most recent pursuit classification
    pub fn last_classification(&self) -> Option<&Classification> {
        self.last_classification.as_ref()
    }

    pub fn session(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|s| SessionInfo {
            session_id: s.session_id,
            started_at: s.started_at,
        })
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.session.as_ref()
    }

    /// Clear all state and arm a new session
    pub fn start(&mut self) -> SessionInfo {
        let info = SessionInfo {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };

        // Dwell areas follow the cues' current centres
        self.engine = Engine::build(&self.config, &self.cues);
        self.clear_state();
        self.session = Some(SessionSummary::new(&info, self.control.value()));
        self.running = true;

        info!(
            "session {} started ({:?}, {})",
            info.session_id,
            self.config.mode,
            self.config.strategy.as_str()
        );
        info
    }

    /// Disarm the detector; returns the finished session's summary
    pub fn stop(&mut self) -> Option<SessionSummary> {
        if !self.running {
            return None;
        }
        self.running = false;

        let mut summary = self.session.clone()?;
        summary.final_value = self.control.value();
        info!(
            "session {} stopped: {} samples, {} increase, {} decrease, value {}",
            summary.session_id,
            summary.samples,
            summary.increase_events,
            summary.decrease_events,
            summary.final_value
        );
        Some(summary)
    }

    /// Clear window and hysteresis without ending the session
    pub fn reset(&mut self) {
        self.clear_state();
        if let Some(session) = self.session.as_mut() {
            session.resets += 1;
        }
        debug!("detector reset");
    }

    /// External saccade notification; same effect as [`reset`](Self::reset)
    pub fn on_saccade(&mut self) {
        self.clear_state();
        if let Some(session) = self.session.as_mut() {
            session.saccades += 1;
        }
        debug!("saccade reset");
    }

    fn clear_state(&mut self) {
        self.engine.reset();
        if let Some(filter) = self.saccade.as_mut() {
            filter.reset();
        }
        self.last_timestamp_ms = None;
        self.last_classification = None;
    }

    /// Feed one pre-aggregated gaze sample.
    ///
    /// Returns `None` while stopped or while the window is not yet ready.
    /// The listener fires once for every sample classified as Increase or
    /// Decrease, not only on state changes.
    pub fn feed(&mut self, timestamp_ms: i64, point: Point) -> Option<Detection> {
        if !self.running {
            debug!("sample at {}ms ignored: detector stopped", timestamp_ms);
            return None;
        }

        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms < last {
                warn!(
                    "timestamp went back from {}ms to {}ms; resetting",
                    last, timestamp_ms
                );
                self.reset();
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);

        let saccade = match self.saccade.as_mut() {
            Some(filter) => filter.observe(point),
            None => false,
        };
        if saccade {
            self.engine.reset();
            self.last_classification = None;
            if let Some(session) = self.session.as_mut() {
                session.saccades += 1;
            }
            debug!("saccade at {}ms", timestamp_ms);
        }

        if let Some(session) = self.session.as_mut() {
            session.samples += 1;
        }

        let (state, duration_ms) = match &mut self.engine {
            Engine::Pursuit { window, classifier } => {
                window.push(self.cues.capture(Sample::new(timestamp_ms, point)));
                if !window.is_ready() {
                    return None;
                }
                let classification = classifier.classify(window)?;
                let result = (classification.state, classification.duration_ms);
                self.last_classification = Some(classification);
                result
            }
            Engine::Dwell { window, classifier } => {
                window.push(Sample::new(timestamp_ms, point));
                if !window.is_ready() {
                    return None;
                }
                let state = classifier.classify(point);
                let duration_ms = match state {
                    State::Increase => classifier.area(CueKind::Increase).accumulated_ms(),
                    State::Decrease => classifier.area(CueKind::Decrease).accumulated_ms(),
                    State::Unknown => 0,
                };
                (state, duration_ms)
            }
        };

        let change = state.direction().and_then(|direction| self.emit(direction));

        if let Some(session) = self.session.as_mut() {
            session.classified += 1;
            session.final_value = self.control.value();
        }

        Some(Detection {
            timestamp_ms,
            state,
            duration_ms,
            value: self.control.value(),
            change,
        })
    }

    fn emit(&mut self, direction: Direction) -> Option<ValueChange> {
        if let Some(session) = self.session.as_mut() {
            match direction {
                Direction::Increase => session.increase_events += 1,
                Direction::Decrease => session.decrease_events += 1,
            }
        }
        let change = self.control.apply(direction);
        if let Some(listener) = self.listener.as_mut() {
            listener(direction);
        }
        change
    }
}

impl std::fmt::Debug for GazeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazeDetector")
            .field("mode", &self.config.mode)
            .field("running", &self.running)
            .field("cues", &self.cues)
            .field("engine", &self.engine)
            .field("value", &self.control.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::{StaticCue, TrackedCue};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    const INTERVAL: i64 = 30;

    /// Increase cue sweeps right and back every 40 ticks; decrease cue mirrors it
    fn cue_positions(tick: i64) -> (Point, Point) {
        let phase = tick % 40;
        let x = if phase < 20 { phase } else { 40 - phase } as f64 * 10.0;
        (
            Point::new(200.0 + x, 300.0),
            Point::new(400.0 - x, 500.0),
        )
    }

    struct Rig {
        detector: GazeDetector,
        increase: TrackedCue,
        decrease: TrackedCue,
        events: Arc<Mutex<Vec<Direction>>>,
    }

    fn rig(config: DetectorConfig) -> Rig {
        let (i, d) = cue_positions(0);
        let increase = TrackedCue::new(i);
        let decrease = TrackedCue::new(d);
        let mut detector =
            GazeDetector::new(config, CuePair::new(increase.clone(), decrease.clone())).unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        detector.set_listener(move |direction| sink.lock().unwrap().push(direction));
        Rig {
            detector,
            increase,
            decrease,
            events,
        }
    }

    impl Rig {
        /// Advance the cues to `tick` and feed gaze on the chosen cue
        fn step(&mut self, tick: i64, follow: CueKind) -> Option<Detection> {
            let (i, d) = cue_positions(tick);
            self.increase.set_location(i);
            self.decrease.set_location(d);
            let gaze = match follow {
                CueKind::Increase => i,
                CueKind::Decrease => d,
            };
            self.detector.feed(tick * INTERVAL, gaze)
        }
    }

    #[test]
    fn test_stopped_detector_ignores_samples() {
        let mut rig = rig(DetectorConfig::default());
        for tick in 0..40 {
            assert_eq!(rig.step(tick, CueKind::Increase), None);
        }
        assert!(rig.events.lock().unwrap().is_empty());
        assert_eq!(rig.detector.value(), 50.0);
    }

    #[test]
    fn test_following_increase_fires_every_sample() {
        let mut rig = rig(DetectorConfig::default());
        rig.detector.start();

        // Window needs one eviction before anything is classified
        for tick in 0..=20 {
            assert_eq!(rig.step(tick, CueKind::Increase), None);
        }

        let mut fired = 0;
        for tick in 21..30 {
            let detection = rig.step(tick, CueKind::Increase).unwrap();
            if detection.state == State::Increase {
                fired += 1;
                assert!(detection.change.is_some());
            }
        }

        let events = rig.events.lock().unwrap();
        assert!(fired > 0);
        assert_eq!(events.len(), fired);
        assert!(events.iter().all(|d| *d == Direction::Increase));
        assert_eq!(rig.detector.value(), 50.0 + fired as f64);
    }

    #[test]
    fn test_following_decrease_lowers_value() {
        let mut rig = rig(DetectorConfig::default());
        rig.detector.start();
        for tick in 0..30 {
            rig.step(tick, CueKind::Decrease);
        }
        let events = rig.events.lock().unwrap();
        assert!(!events.is_empty());
        assert!(events.iter().all(|d| *d == Direction::Decrease));
        assert!(rig.detector.value() < 50.0);
    }

    #[test]
    fn test_reset_requires_window_to_refill() {
        let mut rig = rig(DetectorConfig::default());
        rig.detector.start();
        for tick in 0..25 {
            rig.step(tick, CueKind::Increase);
        }
        assert!(rig.detector.last_classification().is_some());

        rig.detector.on_saccade();
        assert!(rig.detector.last_classification().is_none());
        for tick in 25..46 {
            assert_eq!(rig.step(tick, CueKind::Increase), None);
        }
        assert!(rig.step(46, CueKind::Increase).is_some());

        let summary = rig.detector.summary().unwrap();
        assert_eq!(summary.saccades, 1);
    }

    #[test]
    fn test_timestamp_retreat_is_implicit_reset() {
        let mut rig = rig(DetectorConfig::default());
        rig.detector.start();
        for tick in 0..25 {
            rig.step(tick, CueKind::Increase);
        }
        assert!(rig.step(25, CueKind::Increase).is_some());

        // Clock steps back: window starts over
        assert_eq!(rig.step(5, CueKind::Increase), None);
        assert_eq!(rig.detector.summary().unwrap().resets, 1);
    }

    #[test]
    fn test_start_assigns_fresh_session() {
        let mut rig = rig(DetectorConfig::default());
        assert!(rig.detector.session().is_none());
        assert!(rig.detector.stop().is_none());

        let first = rig.detector.start();
        let second = rig.detector.start();
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(rig.detector.session(), Some(second.clone()));

        for tick in 0..30 {
            rig.step(tick, CueKind::Increase);
        }
        let summary = rig.detector.stop().unwrap();
        assert_eq!(summary.session_id, second.session_id);
        assert_eq!(summary.samples, 30);
        assert_eq!(summary.classified, 30 - 21);
        assert_eq!(summary.final_value, rig.detector.value());
        assert!(!rig.detector.is_running());
    }

    #[test]
    fn test_dwell_mode_uses_cue_centres() {
        let cues = CuePair::new(
            StaticCue::new(Point::new(100.0, 100.0)),
            StaticCue::new(Point::new(500.0, 100.0)),
        );
        let mut detector = GazeDetector::new(DetectorConfig::dwell(), cues).unwrap();
        detector.start();

        let detection = (0..41)
            .filter_map(|tick| detector.feed(tick * INTERVAL, Point::new(510.0, 90.0)))
            .last()
            .unwrap();
        assert_eq!(detection.state, State::Decrease);
        assert_eq!(detection.duration_ms, 600);
        assert_eq!(detection.value, 49.0);
    }

    #[test]
    fn test_dwell_waits_for_window_and_survives_saccade() {
        let cues = CuePair::new(
            StaticCue::new(Point::new(100.0, 100.0)),
            StaticCue::new(Point::new(500.0, 100.0)),
        );
        let mut detector = GazeDetector::new(DetectorConfig::dwell(), cues).unwrap();
        detector.start();
        let gaze = Point::new(100.0, 100.0);

        let detections: Vec<(i64, State)> = (0..46)
            .filter_map(|tick| detector.feed(tick * INTERVAL, gaze).map(|d| (tick, d.state)))
            .collect();
        assert_eq!(detections.first(), Some(&(21, State::Unknown)));
        let first_increase = detections
            .iter()
            .find(|(_, state)| *state == State::Increase)
            .map(|(tick, _)| *tick);
        assert_eq!(first_increase, Some(40));

        // Saccade empties the window but the accumulator keeps its time
        detector.on_saccade();
        for tick in 46..67 {
            assert_eq!(detector.feed(tick * INTERVAL, gaze), None);
        }
        let detection = detector.feed(67 * INTERVAL, gaze).unwrap();
        assert_eq!(detection.state, State::Increase);
        assert_eq!(detection.duration_ms, 700);
    }

    #[test]
    fn test_saccade_filter_resets_window() {
        let mut config = DetectorConfig::default();
        config.saccade.enabled = true;
        let mut rig = rig(config);
        rig.detector.start();
        for tick in 0..25 {
            rig.step(tick, CueKind::Increase);
        }

        // Jump from the increase cue row to the decrease cue row
        assert_eq!(rig.step(25, CueKind::Decrease), None);
        assert_eq!(rig.detector.summary().unwrap().saccades, 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DetectorConfig::default();
        config.buffer_duration_ms = 0;
        let cues = CuePair::new(StaticCue::new(Point::ORIGIN), StaticCue::new(Point::ORIGIN));
        assert!(matches!(
            GazeDetector::new(config, cues),
            Err(PursuitError::InvalidConfig(_))
        ));
    }
}
