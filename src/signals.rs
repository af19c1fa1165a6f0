//! Derived Scalar Outputs
//!
//! Four voltages are read off the register word every tick: the word itself,
//! its complement, and the smaller and larger of the two. Each is normalized
//! by 65535 and mapped through its own [`CvRange`].

use crate::range::CvRange;
use serde::{Deserialize, Serialize};

/// Full-scale value of a 16-bit word
const WORD_SCALE: f64 = 65535.0;

/// Output ranges for the four derived voltages
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputRanges {
    pub direct: CvRange,
    pub flipped: CvRange,
    pub min: CvRange,
    pub max: CvRange,
}

impl OutputRanges {
    pub fn get(&self, output: DerivedOutput) -> &CvRange {
        match output {
            DerivedOutput::Direct => &self.direct,
            DerivedOutput::Flipped => &self.flipped,
            DerivedOutput::Min => &self.min,
            DerivedOutput::Max => &self.max,
        }
    }

    pub fn get_mut(&mut self, output: DerivedOutput) -> &mut CvRange {
        match output {
            DerivedOutput::Direct => &mut self.direct,
            DerivedOutput::Flipped => &mut self.flipped,
            DerivedOutput::Min => &mut self.min,
            DerivedOutput::Max => &mut self.max,
        }
    }
}

/// Selector for one of the four derived voltages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedOutput {
    Direct,
    Flipped,
    Min,
    Max,
}

impl DerivedOutput {
    pub const ALL: [DerivedOutput; 4] = [
        DerivedOutput::Direct,
        DerivedOutput::Flipped,
        DerivedOutput::Min,
        DerivedOutput::Max,
    ];
}

/// Normalized values (0–1) of the four derived outputs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Normalized {
    pub direct: f64,
    pub flipped: f64,
    pub min: f64,
    pub max: f64,
}

impl Normalized {
    pub fn from_bits(bits: u16) -> Self {
        let flipped = !bits;
        Self {
            direct: bits as f64 / WORD_SCALE,
            flipped: flipped as f64 / WORD_SCALE,
            min: bits.min(flipped) as f64 / WORD_SCALE,
            max: bits.max(flipped) as f64 / WORD_SCALE,
        }
    }
}

/// The four derived output voltages
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedSignals {
    pub direct: f64,
    pub flipped: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute the derived voltages for a register word
pub fn derive(bits: u16, ranges: &OutputRanges) -> DerivedSignals {
    let n = Normalized::from_bits(bits);
    DerivedSignals {
        direct: ranges.direct.map(n.direct),
        flipped: ranges.flipped.map(n.flipped),
        min: ranges.min.map(n.min),
        max: ranges.max.map(n.max),
    }
}
