//! Shift Register Engine
//!
//! Owns the 16-bit register word and applies the clocked transition: on each
//! clock edge the word rotates by the shift amount, the edge bit may flip
//! depending on a uniform random draw, and the clear/set controls force a
//! sweep of bits low or high.

use serde::{Deserialize, Serialize};

/// Width of the register in bits
pub const REGISTER_BITS: usize = 16;

/// Mask with only bit `index` set.
#[inline]
pub const fn bit_mask(index: u32) -> u16 {
    1 << index
}

/// Bits touched by the clear/set controls for a given shift amount.
///
/// Step `i` of the sweep addresses bit `(15 << i) mod 16`, so the sweep
/// visits bits 15, 14, 12, 8 and then stays on bit 0:
///
/// | shift | mask     |
/// |-------|----------|
/// | 1     | `0x8000` |
/// | 2     | `0xC000` |
/// | 3     | `0xD000` |
/// | 4     | `0xD100` |
/// | 5..   | `0xD101` |
pub const fn sweep_mask(shift: u32) -> u16 {
    let mut mask = 0u16;
    let mut i = 0;
    while i < shift {
        mask |= bit_mask((15u32 << i) % REGISTER_BITS as u32);
        i += 1;
    }
    mask
}

/// Rotation direction of the register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Bits move toward the high end; the edge bit is bit 0
    LeftToRight,
    /// Bits move toward the low end; the edge bit is bit 15
    #[default]
    RightToLeft,
}

impl Direction {
    /// Decode a two-position switch value (0 = right-to-left, 1 = left-to-right)
    pub fn from_switch(value: f64) -> Self {
        if value > 0.5 {
            Direction::LeftToRight
        } else {
            Direction::RightToLeft
        }
    }

    pub fn as_switch(self) -> f64 {
        match self {
            Direction::RightToLeft => 0.0,
            Direction::LeftToRight => 1.0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
        }
    }

    /// Index of the bit that may flip after rotating in this direction
    pub fn edge_bit(self) -> u32 {
        match self {
            Direction::LeftToRight => 0,
            Direction::RightToLeft => 15,
        }
    }

    /// Rotate `bits` by `amount` positions in this direction
    #[inline]
    pub fn rotate(self, bits: u16, amount: ShiftAmount) -> u16 {
        match self {
            Direction::LeftToRight => bits.rotate_left(amount.get()),
            Direction::RightToLeft => bits.rotate_right(amount.get()),
        }
    }
}

/// Number of positions to rotate per clock edge, always in `1..=15`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ShiftAmount(u32);

impl ShiftAmount {
    pub const MIN: ShiftAmount = ShiftAmount(1);
    pub const MAX: ShiftAmount = ShiftAmount(15);

    /// Coerce any integer into `1..=15`
    pub fn new(raw: i64) -> Self {
        Self(raw.clamp(Self::MIN.0 as i64, Self::MAX.0 as i64) as u32)
    }

    /// Snap a knob position (1.0–15.0) to the nearest whole shift
    pub fn from_knob(value: f64) -> Self {
        Self::new(libm::round(value) as i64)
    }

    /// Map a 0–10V control voltage onto 1–15 bits.
    ///
    /// The scaled voltage is truncated toward zero before clamping, so
    /// anything below 2/3 V selects a shift of 1.
    pub fn from_cv(volts: f64) -> Self {
        Self::new(((volts / 10.0) * 15.0) as i64)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ShiftAmount {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u32> for ShiftAmount {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("shift amount {} outside 1..=15", value))
        }
    }
}

impl From<ShiftAmount> for u32 {
    fn from(amount: ShiftAmount) -> u32 {
        amount.0
    }
}

/// Per-edge transition settings, sampled from the panel and inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// The edge bit flips when the random draw is `>= probability`,
    /// so the chance of a flip is `1 - probability`.
    pub probability: f64,
    pub shift: ShiftAmount,
    pub clear: bool,
    pub set: bool,
    pub direction: Direction,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            probability: 0.5,
            shift: ShiftAmount::MIN,
            clear: false,
            set: false,
            direction: Direction::RightToLeft,
        }
    }
}

/// Result of one call to [`ShiftRegister::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Register word after the step
    pub bits: u16,
    /// Whether the edge bit flipped during this step
    pub flipped: bool,
}

/// The 16-bit shift register
#[derive(Debug, Clone, Default)]
pub struct ShiftRegister {
    bits: u16,
    last_flip: bool,
}

impl ShiftRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current register word
    #[inline]
    pub fn bits(&self) -> u16 {
        self.bits
    }

    /// Bitwise complement of the register word
    #[inline]
    pub fn complement(&self) -> u16 {
        !self.bits
    }

    /// Whether bit `index` is set
    #[inline]
    pub fn is_set(&self, index: u32) -> bool {
        self.bits & bit_mask(index) != 0
    }

    /// Whether the edge bit flipped on the most recent clock edge.
    ///
    /// Unlike [`Step::flipped`], this holds its value between edges.
    pub fn last_flip(&self) -> bool {
        self.last_flip
    }

    /// Overwrite the register word
    pub fn load(&mut self, bits: u16) {
        self.bits = bits;
    }

    pub fn reset(&mut self) {
        self.bits = 0;
        self.last_flip = false;
    }

    /// Advance the register by one tick.
    ///
    /// Without an edge nothing changes. On an edge the word is rotated, the edge
    /// bit flips if `sample >= cfg.probability`, then the sweep mask is cleared
    /// and finally set, each stage applied to the result of the previous one.
    pub fn step(&mut self, edge: bool, cfg: &TransitionConfig, sample: f64) -> Step {
        if !edge {
            return Step {
                bits: self.bits,
                flipped: false,
            };
        }

        let mut bits = cfg.direction.rotate(self.bits, cfg.shift);

        let flipped = sample >= cfg.probability;
        if flipped {
            bits ^= bit_mask(cfg.direction.edge_bit());
        }

        let sweep = sweep_mask(cfg.shift.get());
        if cfg.clear {
            bits &= !sweep;
        }
        if cfg.set {
            bits |= sweep;
        }

        self.bits = bits;
        self.last_flip = flipped;

        Step { bits, flipped }
    }
}
