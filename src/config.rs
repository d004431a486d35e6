//! Detector configuration
//!
//! All thresholds are empirically tuned values. They are configuration, not
//! invariants: the defaults below are what the pursuit controls were tuned
//! with, and hosts are free to load their own.

use crate::error::PursuitError;
use crate::stats::StatisticsStrategy;
use crate::window::DEFAULT_BUFFER_DURATION_MS;
use serde::{Deserialize, Serialize};

/// Default interval between aggregated gaze samples (ms)
pub const DEFAULT_SAMPLE_INTERVAL_MS: i64 = 30;

/// Thresholds for the pursuit classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuitConfig {
    /// Offset STD (pixels) below which the gaze counts as following a cue
    pub distance_std_threshold_px: f64,
    /// Allowed fractional deviation of track displacement from the cue's own
    pub max_displacement_variance: f64,
    /// Consecutive disagreeing ambiguous samples tolerated before flipping
    pub conflict_tolerance: u32,
    /// Also require a stable offset angle for distant cues
    pub track_angles: bool,
    /// Offset angle STD threshold (degrees), used when `track_angles` is on
    pub angle_std_threshold_deg: f64,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            distance_std_threshold_px: 15.0,
            max_displacement_variance: 0.5,
            conflict_tolerance: 7,
            track_angles: false,
            angle_std_threshold_deg: 6.0,
        }
    }
}

/// Dwell area settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Side of the square responsive area around each cue (pixels)
    pub area_size_px: f64,
    /// Accumulated gaze time needed to activate an area (ms)
    pub dwell_time_ms: i64,
    /// Extra accumulation allowed above `dwell_time_ms` (ms)
    pub hysteresis_ms: i64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            area_size_px: 160.0,
            dwell_time_ms: 600,
            hysteresis_ms: 100,
        }
    }
}

impl DwellConfig {
    /// Cap of the accumulator
    pub fn max_accumulated_ms(&self) -> i64 {
        self.dwell_time_ms + self.hysteresis_ms
    }
}

/// Saccade filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaccadeConfig {
    pub enabled: bool,
    /// Jump between smoothed points that counts as a saccade (pixels)
    pub min_fixation_distance_px: f64,
    /// Weight of the previous point in the smoothing average
    pub smoothing_alpha: f64,
}

impl Default for SaccadeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_fixation_distance_px: 70.0,
            smoothing_alpha: 1.0,
        }
    }
}

/// Bounded value driven by direction events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub max_value: f64,
    pub initial_value: f64,
    /// Value change per direction event
    pub step: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_value: 100.0,
            initial_value: 50.0,
            step: 1.0,
        }
    }
}

/// Which classifier a detector runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    /// Smooth pursuit of moving cues
    #[default]
    Pursuit,
    /// Dwell on static cues
    Dwell,
}

/// Full detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub mode: DetectorMode,
    pub strategy: StatisticsStrategy,
    pub sample_interval_ms: i64,
    pub buffer_duration_ms: i64,
    pub pursuit: PursuitConfig,
    pub dwell: DwellConfig,
    pub saccade: SaccadeConfig,
    pub control: ControlConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectorMode::default(),
            strategy: StatisticsStrategy::default(),
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            buffer_duration_ms: DEFAULT_BUFFER_DURATION_MS,
            pursuit: PursuitConfig::default(),
            dwell: DwellConfig::default(),
            saccade: SaccadeConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Dwell-mode configuration with otherwise default settings
    pub fn dwell() -> Self {
        Self {
            mode: DetectorMode::Dwell,
            ..Self::default()
        }
    }

    /// Load and validate configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, PursuitError> {
        let config: DetectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, PursuitError> {
        serde_json::to_string_pretty(self).map_err(|e| PursuitError::EncodingError(e.to_string()))
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), PursuitError> {
        if self.sample_interval_ms <= 0 {
            return Err(invalid("sample_interval_ms must be positive"));
        }
        if self.buffer_duration_ms <= 0 {
            return Err(invalid("buffer_duration_ms must be positive"));
        }
        if self.buffer_duration_ms < self.sample_interval_ms {
            return Err(invalid(
                "buffer_duration_ms must cover at least one sample interval",
            ));
        }

        let p = &self.pursuit;
        if !(p.distance_std_threshold_px > 0.0) {
            return Err(invalid("pursuit.distance_std_threshold_px must be positive"));
        }
        if !(p.max_displacement_variance > 0.0 && p.max_displacement_variance < 1.0) {
            return Err(invalid("pursuit.max_displacement_variance must be in (0,1)"));
        }
        if !(p.angle_std_threshold_deg > 0.0) {
            return Err(invalid("pursuit.angle_std_threshold_deg must be positive"));
        }

        let d = &self.dwell;
        if !(d.area_size_px > 0.0) {
            return Err(invalid("dwell.area_size_px must be positive"));
        }
        if d.dwell_time_ms <= 0 || d.hysteresis_ms < 0 {
            return Err(invalid(
                "dwell.dwell_time_ms must be positive and dwell.hysteresis_ms non-negative",
            ));
        }

        let s = &self.saccade;
        if !(s.min_fixation_distance_px > 0.0) || !(s.smoothing_alpha >= 0.0) {
            return Err(invalid(
                "saccade.min_fixation_distance_px must be positive and smoothing_alpha non-negative",
            ));
        }

        let c = &self.control;
        if !(c.max_value > 0.0) || !(c.step > 0.0) {
            return Err(invalid("control.max_value and control.step must be positive"));
        }
        if !(0.0..=c.max_value).contains(&c.initial_value) {
            return Err(invalid("control.initial_value must be within [0, max_value]"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> PursuitError {
    PursuitError::InvalidConfig(msg.to_string())
}
