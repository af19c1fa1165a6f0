//! Pulse Shaping
//!
//! Each bit output (and the auxiliary event output) turns a static condition
//! such as "bit 3 is set" into a time-varying voltage. The [`PulseMode`]
//! selects one of three disciplines:
//!
//! - **Trigger**: a fixed-length one-shot fired on clock edges where the
//!   condition holds
//! - **Clock**: the live clock level passed through while the condition holds
//! - **Hold**: a full-scale gate held for as long as the condition holds
//!
//! Every channel also drives an indicator light with its own pulse length.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// One-shot length of an output trigger, in seconds
pub const TRIGGER_DURATION: f64 = 0.01;

/// One-shot length of an indicator flash, in seconds
pub const LIGHT_DURATION: f64 = 0.05;

/// Full-scale output voltage
pub const GATE_VOLTAGE: f64 = 10.0;

/// Clock level above which a passthrough indicator lights
pub const LIGHT_THRESHOLD: f64 = 0.5;

/// Remaining time at or below this counts as elapsed
const TIME_EPSILON: f64 = 1e-9;

/// Output discipline for a group of pulse channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum PulseMode {
    Trigger,
    #[default]
    Clock,
    Hold,
}

impl PulseMode {
    pub const ALL: [PulseMode; 3] = [PulseMode::Trigger, PulseMode::Clock, PulseMode::Hold];

    /// Decode a persisted menu index; unknown indices fall back to `Clock`
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn index(self) -> usize {
        match self {
            PulseMode::Trigger => 0,
            PulseMode::Clock => 1,
            PulseMode::Hold => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PulseMode::Trigger => "trigger",
            PulseMode::Clock => "clock",
            PulseMode::Hold => "hold",
        }
    }
}

impl fmt::Display for PulseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PulseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.label() == s)
            .ok_or_else(|| format!("unknown pulse mode: {}", s))
    }
}

/// Fixed-duration one-shot timer
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseGenerator {
    remaining: f64,
}

impl PulseGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pulse of `duration` seconds, restarting any pulse in flight
    pub fn trigger(&mut self, duration: f64) {
        self.remaining = duration;
    }

    /// Advance by `dt` seconds; returns whether the pulse was high this tick
    pub fn process(&mut self, dt: f64) -> bool {
        if self.remaining > TIME_EPSILON {
            self.remaining -= dt;
            true
        } else {
            self.remaining = 0.0;
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > TIME_EPSILON
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

/// Durations and levels shared by every channel of a module
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseTiming {
    pub trigger_duration: f64,
    pub light_duration: f64,
    pub gate_voltage: f64,
    pub light_threshold: f64,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            trigger_duration: TRIGGER_DURATION,
            light_duration: LIGHT_DURATION,
            gate_voltage: GATE_VOLTAGE,
            light_threshold: LIGHT_THRESHOLD,
        }
    }
}

/// Per-tick inputs of a pulse channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PulseInput {
    /// A clock edge was detected this tick
    pub edge: bool,
    /// The channel's condition (bit set, or event occurred)
    pub condition: bool,
    /// Live clock input level in volts
    pub clock: f64,
}

/// Output voltage and indicator brightness of a pulse channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PulseOutput {
    pub voltage: f64,
    pub light: f64,
}

/// Timing state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Pulsing,
}

/// A single pulse channel
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseShaper {
    output: PulseGenerator,
    light: PulseGenerator,
}

impl PulseShaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        if self.output.is_active() {
            ChannelState::Pulsing
        } else {
            ChannelState::Idle
        }
    }

    pub fn reset(&mut self) {
        self.output.reset();
        self.light.reset();
    }

    /// Produce this tick's output under `mode`, advancing timers by `dt` seconds
    pub fn step(
        &mut self,
        mode: PulseMode,
        input: PulseInput,
        timing: &PulseTiming,
        dt: f64,
    ) -> PulseOutput {
        match mode {
            PulseMode::Trigger => {
                if input.edge && input.condition {
                    self.output.trigger(timing.trigger_duration);
                    self.light.trigger(timing.light_duration);
                }
                // Both timers advance every tick
                let high = self.output.process(dt);
                let lit = self.light.process(dt);
                PulseOutput {
                    voltage: if high { timing.gate_voltage } else { 0.0 },
                    light: if input.condition && lit { 1.0 } else { 0.0 },
                }
            }
            PulseMode::Clock => {
                self.reset();
                PulseOutput {
                    voltage: if input.condition { input.clock } else { 0.0 },
                    light: if input.condition && input.clock > timing.light_threshold {
                        1.0
                    } else {
                        0.0
                    },
                }
            }
            PulseMode::Hold => {
                self.reset();
                let level = if input.condition { 1.0 } else { 0.0 };
                PulseOutput {
                    voltage: level * timing.gate_voltage,
                    light: level,
                }
            }
        }
    }
}
