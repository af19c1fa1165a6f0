//! Module Configuration
//!
//! Construction-time settings for a [`TapeMachine`](crate::modules::TapeMachine).
//! Every field has a default, so a configuration document only needs to name
//! the fields it changes.

use crate::pulse::{PulseTiming, GATE_VOLTAGE, LIGHT_DURATION, LIGHT_THRESHOLD, TRIGGER_DURATION};
use crate::sampler::DEFAULT_PARAM_INTERVAL;
use serde::{Deserialize, Serialize};

/// Panel layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// No direction control and no event-pulse output
    Basic,
    /// Direction switch and toggle input, plus the event-pulse output
    #[default]
    Extended,
}

/// Construction-time settings for the tape machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeMachineConfig {
    pub variant: Variant,

    /// Ticks between panel reads
    pub param_interval: usize,

    /// Clear/set inputs count as active strictly above this level (volts)
    pub gate_threshold: f64,

    /// Clock passthrough indicators light strictly above this level (volts)
    pub light_threshold: f64,

    /// Output trigger length in seconds
    pub trigger_duration: f64,

    /// Indicator flash length in seconds
    pub light_duration: f64,

    /// Full-scale gate/trigger level in volts
    pub gate_voltage: f64,
}

impl TapeMachineConfig {
    pub fn basic() -> Self {
        Self {
            variant: Variant::Basic,
            ..Self::default()
        }
    }

    pub fn with_param_interval(mut self, interval: usize) -> Self {
        self.param_interval = interval;
        self
    }

    /// Coerce out-of-domain values, logging each correction
    pub fn sanitized(mut self) -> Self {
        if self.param_interval == 0 {
            tracing::warn!("param_interval of 0 coerced to 1");
            self.param_interval = 1;
        }
        if !(self.trigger_duration > 0.0) {
            tracing::warn!(
                value = self.trigger_duration,
                "trigger_duration must be positive; using default"
            );
            self.trigger_duration = TRIGGER_DURATION;
        }
        if !(self.light_duration > 0.0) {
            tracing::warn!(
                value = self.light_duration,
                "light_duration must be positive; using default"
            );
            self.light_duration = LIGHT_DURATION;
        }
        self
    }

    pub fn pulse_timing(&self) -> PulseTiming {
        PulseTiming {
            trigger_duration: self.trigger_duration,
            light_duration: self.light_duration,
            gate_voltage: self.gate_voltage,
            light_threshold: self.light_threshold,
        }
    }

    /// Parse a configuration document; missing fields take their defaults
    #[cfg(feature = "alloc")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    #[cfg(feature = "alloc")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for TapeMachineConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Extended,
            param_interval: DEFAULT_PARAM_INTERVAL,
            gate_threshold: 5.0,
            light_threshold: LIGHT_THRESHOLD,
            trigger_duration: TRIGGER_DURATION,
            light_duration: LIGHT_DURATION,
            gate_voltage: GATE_VOLTAGE,
        }
    }
}
