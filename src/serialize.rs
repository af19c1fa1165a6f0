//! Serialization and Persistence
//!
//! The persisted state of a tape machine is small: the two pulse-mode indices
//! and the four output ranges. [`TapeMachineData`] is the full document;
//! [`StatePatch`] is a leniently decoded document in which every missing or
//! mistyped field is simply absent, so restoring it leaves the corresponding
//! setting untouched.

use crate::range::CvRange;
use crate::signals::{DerivedOutput, OutputRanges};
use serde::{Deserialize, Serialize};

/// Document keys of the four range entries
const RANGE_KEYS: [(DerivedOutput, &str); 4] = [
    (DerivedOutput::Direct, "voltage_range"),
    (DerivedOutput::Flipped, "flipped_voltage_range"),
    (DerivedOutput::Min, "min_voltage_range"),
    (DerivedOutput::Max, "max_voltage_range"),
];

/// Error types for persistence operations
#[derive(Debug, Clone, PartialEq)]
pub enum PersistError {
    /// The document is not valid JSON
    Parse(String),
    /// The document is valid JSON but not an object
    NotAnObject,
}

impl core::fmt::Display for PersistError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PersistError::Parse(msg) => write!(f, "Failed to parse state: {}", msg),
            PersistError::NotAnObject => write!(f, "State document must be a JSON object"),
        }
    }
}

impl std::error::Error for PersistError {}

/// Complete persisted state of a tape machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapeMachineData {
    pub bit_pulse_mode: usize,
    pub random_pulse_mode: usize,
    pub voltage_range: CvRange,
    pub flipped_voltage_range: CvRange,
    pub min_voltage_range: CvRange,
    pub max_voltage_range: CvRange,
}

impl TapeMachineData {
    pub fn new(bit_pulse_mode: usize, random_pulse_mode: usize, ranges: &OutputRanges) -> Self {
        Self {
            bit_pulse_mode,
            random_pulse_mode,
            voltage_range: ranges.direct,
            flipped_voltage_range: ranges.flipped,
            min_voltage_range: ranges.min,
            max_voltage_range: ranges.max,
        }
    }

    pub fn ranges(&self) -> OutputRanges {
        OutputRanges {
            direct: self.voltage_range,
            flipped: self.flipped_voltage_range,
            min: self.min_voltage_range,
            max: self.max_voltage_range,
        }
    }

    #[cfg(feature = "alloc")]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "bit_pulse_mode": self.bit_pulse_mode,
            "random_pulse_mode": self.random_pulse_mode,
            "voltage_range": self.voltage_range,
            "flipped_voltage_range": self.flipped_voltage_range,
            "min_voltage_range": self.min_voltage_range,
            "max_voltage_range": self.max_voltage_range,
        })
    }

    /// Serialize to JSON string
    #[cfg(feature = "alloc")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Partial update of one range; absent bounds keep their current value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangePatch {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl RangePatch {
    pub fn apply(&self, range: &mut CvRange) {
        if let Some(low) = self.low {
            range.low = low;
        }
        if let Some(high) = self.high {
            range.high = high;
        }
    }
}

/// Leniently decoded persisted state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePatch {
    pub bit_pulse_mode: Option<usize>,
    pub random_pulse_mode: Option<usize>,
    pub direct: Option<RangePatch>,
    pub flipped: Option<RangePatch>,
    pub min: Option<RangePatch>,
    pub max: Option<RangePatch>,
}

impl StatePatch {
    pub fn range(&self, output: DerivedOutput) -> Option<&RangePatch> {
        match output {
            DerivedOutput::Direct => self.direct.as_ref(),
            DerivedOutput::Flipped => self.flipped.as_ref(),
            DerivedOutput::Min => self.min.as_ref(),
            DerivedOutput::Max => self.max.as_ref(),
        }
    }

    fn range_mut(&mut self, output: DerivedOutput) -> &mut Option<RangePatch> {
        match output {
            DerivedOutput::Direct => &mut self.direct,
            DerivedOutput::Flipped => &mut self.flipped,
            DerivedOutput::Min => &mut self.min,
            DerivedOutput::Max => &mut self.max,
        }
    }

    /// Apply every present field to `ranges`
    pub fn apply_ranges(&self, ranges: &mut OutputRanges) {
        for output in DerivedOutput::ALL {
            if let Some(patch) = self.range(output) {
                patch.apply(ranges.get_mut(output));
            }
        }
    }

    /// Decode from a JSON value; fields that are missing or of the wrong type are skipped
    #[cfg(feature = "alloc")]
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PersistError> {
        let obj = value.as_object().ok_or(PersistError::NotAnObject)?;

        let index = |key: &str| {
            obj.get(key)
                .and_then(serde_json::Value::as_u64)
                .map(|i| i as usize)
        };

        let mut patch = StatePatch {
            bit_pulse_mode: index("bit_pulse_mode"),
            random_pulse_mode: index("random_pulse_mode"),
            ..StatePatch::default()
        };

        for (output, key) in RANGE_KEYS {
            if let Some(range) = obj.get(key).and_then(serde_json::Value::as_object) {
                *patch.range_mut(output) = Some(RangePatch {
                    low: range.get("low").and_then(serde_json::Value::as_f64),
                    high: range.get("high").and_then(serde_json::Value::as_f64),
                });
            }
        }

        Ok(patch)
    }

    /// Decode from a JSON string
    #[cfg(feature = "alloc")]
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PersistError::Parse(e.to_string()))?;
        Self::from_value(&value)
    }
}

impl From<&TapeMachineData> for StatePatch {
    fn from(data: &TapeMachineData) -> Self {
        let full = |range: CvRange| {
            Some(RangePatch {
                low: Some(range.low),
                high: Some(range.high),
            })
        };
        StatePatch {
            bit_pulse_mode: Some(data.bit_pulse_mode),
            random_pulse_mode: Some(data.random_pulse_mode),
            direct: full(data.voltage_range),
            flipped: full(data.flipped_voltage_range),
            min: full(data.min_voltage_range),
            max: full(data.max_voltage_range),
        }
    }
}
