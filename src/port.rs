//! Signal Conventions and Host Boundary
//!
//! This module defines the signal kinds, port and parameter definitions, and the
//! type-erased [`GraphModule`] interface through which a host feeds inputs to a
//! module and collects its outputs once per sample.

use libm::Libm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a port within a module
pub type PortId = u32;

/// Unique identifier for a parameter within a module
pub type ParamId = u32;

/// Semantic signal classification following hardware modular conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Bipolar control voltage (stepped random voltages, default ±1V)
    CvBipolar,

    /// Unipolar control voltage, 0–10V (shift amount CV)
    CvUnipolar,

    /// Gate signal, 0V or +10V, held while a condition is true
    Gate,

    /// Trigger signal, short pulse (~10ms) at +10V
    Trigger,

    /// Clock signal, regular pulses at tempo
    Clock,
}

/// Definition of a single port (input or output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDef {
    /// Unique identifier within the module
    pub id: PortId,

    /// Human-readable name (e.g., "clock", "flipped", "bit3")
    pub name: String,

    /// Signal type for validation and UI hints
    pub kind: SignalKind,
}

impl PortDef {
    pub fn new(id: PortId, name: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }
}

/// Specification of all ports for a module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortSpec {
    pub inputs: Vec<PortDef>,
    pub outputs: Vec<PortDef>,
}

impl PortSpec {
    pub fn input_by_name(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_by_name(&self, name: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// Runtime port values container
///
/// An input port that is absent from the map is treated as unpatched.
#[derive(Debug, Clone, Default)]
pub struct PortValues {
    pub values: HashMap<PortId, f64>,
}

impl PortValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PortId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn get_or(&self, id: PortId, default: f64) -> f64 {
        self.values.get(&id).copied().unwrap_or(default)
    }

    pub fn set(&mut self, id: PortId, value: f64) {
        self.values.insert(id, value);
    }

    pub fn has(&self, id: PortId) -> bool {
        self.values.contains_key(&id)
    }
}

/// Value domain of a panel parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamRange {
    /// Continuous value in (min, max)
    Linear { min: f64, max: f64 },

    /// Integer value in (min, max); writes snap to the nearest step.
    /// Buttons and switches are `Stepped { min: 0.0, max: 1.0 }`.
    Stepped { min: f64, max: f64 },
}

impl ParamRange {
    /// Coerce a raw value into this range
    pub fn clamp(&self, value: f64) -> f64 {
        match *self {
            ParamRange::Linear { min, max } => value.clamp(min, max),
            ParamRange::Stepped { min, max } => Libm::<f64>::round(value).clamp(min, max),
        }
    }
}

/// Parameter definition for UI binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub id: ParamId,
    pub name: String,
    pub default: f64,
    pub range: ParamRange,
}

impl ParamDef {
    pub fn new(id: ParamId, name: impl Into<String>, default: f64, range: ParamRange) -> Self {
        Self {
            id,
            name: name.into(),
            default,
            range,
        }
    }
}

/// Type-erased module interface for host-driven processing
pub trait GraphModule: Send + Sync {
    /// Returns the module's port specification
    fn port_spec(&self) -> &PortSpec;

    /// Process one sample given port values
    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues);

    /// Reset internal state
    fn reset(&mut self);

    /// Set sample rate
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Get parameter definitions for UI binding
    fn params(&self) -> &[ParamDef] {
        &[]
    }

    /// Get a parameter value
    fn get_param(&self, _id: ParamId) -> Option<f64> {
        None
    }

    /// Set a parameter value
    fn set_param(&mut self, _id: ParamId, _value: f64) {}

    /// Get module type identifier for serialization
    fn type_id(&self) -> &'static str {
        "unknown"
    }

    /// Serialize module state (alloc feature only)
    #[cfg(feature = "alloc")]
    fn serialize_state(&self) -> Option<serde_json::Value> {
        None
    }

    /// Deserialize module state (alloc feature only)
    #[cfg(feature = "alloc")]
    fn deserialize_state(&mut self, _state: &serde_json::Value) -> Result<(), String> {
        Ok(())
    }
}
