//! Bounded value driven by direction events
//!
//! The typical consumer of the detector: a knob or slider that moves one step
//! per direction event and stays within `[0, max_value]`.

use crate::config::ControlConfig;
use crate::types::Direction;
use serde::{Deserialize, Serialize};

/// A value transition caused by one direction event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub previous: f64,
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueControl {
    value: f64,
    max_value: f64,
    step: f64,
}

impl Default for ValueControl {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl ValueControl {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            value: config.initial_value.min(config.max_value).max(0.0),
            max_value: config.max_value,
            step: config.step,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Set the value directly (clamped); returns the change if there was one
    pub fn set(&mut self, value: f64) -> Option<ValueChange> {
        let previous = self.value;
        let current = value.min(self.max_value).max(0.0);
        if current == previous {
            return None;
        }
        self.value = current;
        Some(ValueChange { previous, current })
    }

    /// Move one step in `direction`
    pub fn apply(&mut self, direction: Direction) -> Option<ValueChange> {
        self.set(self.value + direction.sign() * self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_steps_from_initial_value() {
        let mut control = ValueControl::default();
        assert_eq!(control.value(), 50.0);
        assert_eq!(
            control.apply(Direction::Increase),
            Some(ValueChange {
                previous: 50.0,
                current: 51.0
            })
        );
        control.apply(Direction::Decrease);
        control.apply(Direction::Decrease);
        assert_eq!(control.value(), 49.0);
    }

    #[test]
    fn test_clamped_at_bounds_without_event() {
        let mut control = ValueControl::new(&ControlConfig {
            max_value: 2.0,
            initial_value: 1.0,
            step: 1.0,
        });
        assert!(control.apply(Direction::Increase).is_some());
        assert_eq!(control.apply(Direction::Increase), None);
        assert_eq!(control.value(), 2.0);

        assert_eq!(
            control.set(-10.0),
            Some(ValueChange {
                previous: 2.0,
                current: 0.0
            })
        );
        assert_eq!(control.apply(Direction::Decrease), None);
    }
}
