//! Output Voltage Ranges
//!
//! A [`CvRange`] linearly maps a normalized value in `[0, 1]` onto a voltage
//! span given by two endpoints. The endpoints are independent: `low` may be
//! greater than `high` (an inverted range) or equal to it (a constant output).

use serde::{Deserialize, Serialize};

/// Linear mapping from a normalized value onto an output voltage span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvRange {
    /// Output voltage at normalized 0.0
    pub low: f64,
    /// Output voltage at normalized 1.0
    pub high: f64,
}

impl CvRange {
    /// Named ranges offered to hosts for quick selection.
    pub const PRESETS: [(&'static str, CvRange); 10] = [
        ("+/-1V", CvRange::new(-1.0, 1.0)),
        ("+/-2V", CvRange::new(-2.0, 2.0)),
        ("+/-3V", CvRange::new(-3.0, 3.0)),
        ("+/-5V", CvRange::new(-5.0, 5.0)),
        ("+/-10V", CvRange::new(-10.0, 10.0)),
        ("0V-1V", CvRange::new(0.0, 1.0)),
        ("0V-2V", CvRange::new(0.0, 2.0)),
        ("0V-3V", CvRange::new(0.0, 3.0)),
        ("0V-5V", CvRange::new(0.0, 5.0)),
        ("0V-10V", CvRange::new(0.0, 10.0)),
    ];

    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Look up a preset by its label
    pub fn preset(label: &str) -> Option<CvRange> {
        Self::PRESETS
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, range)| *range)
    }

    /// Map a normalized value onto the range.
    ///
    /// The input is not clamped; callers pass values in `[0, 1]`.
    #[inline]
    pub fn map(&self, normalized: f64) -> f64 {
        self.low + normalized * (self.high - self.low)
    }

    /// Replace both endpoints; takes effect on the next [`map`](Self::map).
    pub fn set(&mut self, low: f64, high: f64) {
        self.low = low;
        self.high = high;
    }
}

impl Default for CvRange {
    fn default() -> Self {
        Self::new(-1.0, 1.0)
    }
}
