//! Gaze Pursuit - smooth-pursuit gaze classification for eye-driven controls
//!
//! Two on-screen cues move in distinct patterns; the user changes a value by
//! following one of them with their eyes. The engine turns a stream of gaze
//! samples into per-sample `Increase` / `Decrease` / `Unknown` decisions:
//! windowed sample buffer → per-cue offset statistics → hysteresis state
//! machine → direction events.
//!
//! ## Modules
//!
//! - **Detector**: [`GazeDetector`] session object, the main entry point
//! - **Classification**: pursuit (moving cues) and dwell (static cues) strategies
//! - **Trace replay**: recorded gaze traces in, classified records out

pub mod aggregate;
pub mod angle;
pub mod classifier;
pub mod config;
pub mod control;
pub mod cue;
pub mod detector;
pub mod dwell;
pub mod error;
pub mod saccade;
pub mod stats;
pub mod trace;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{DetectorConfig, DetectorMode};
pub use cue::{Cue, CuePair, StaticCue, TrackedCue};
pub use detector::{Detection, GazeDetector, SessionInfo, SessionSummary};
pub use error::PursuitError;
pub use stats::StatisticsStrategy;
pub use types::{Direction, Point, Sample, State};

// Trace exports
pub use trace::{replay_trace, ReplayReport, TraceEvent, TraceReplayer, TRACE_SCHEMA_VERSION};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by tools built on the engine
pub const PRODUCER_NAME: &str = "gaze-pursuit";
