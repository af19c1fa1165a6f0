//! Rising-edge detection with hysteresis.

/// Default level at or below which a high input returns low
pub const LOW_THRESHOLD: f64 = 0.0;

/// Default level at or above which a low input goes high
pub const HIGH_THRESHOLD: f64 = 1.0;

/// Schmitt trigger reporting low-to-high transitions
#[derive(Debug, Clone, Copy)]
pub struct SchmittTrigger {
    high: bool,
    low_threshold: f64,
    high_threshold: f64,
}

impl SchmittTrigger {
    pub fn new() -> Self {
        Self::with_thresholds(LOW_THRESHOLD, HIGH_THRESHOLD)
    }

    pub fn with_thresholds(low_threshold: f64, high_threshold: f64) -> Self {
        Self {
            high: false,
            low_threshold,
            high_threshold,
        }
    }

    /// Feed one sample; returns `true` only on the tick the input goes high
    pub fn process(&mut self, input: f64) -> bool {
        if self.high {
            if input <= self.low_threshold {
                self.high = false;
            }
            false
        } else if input >= self.high_threshold {
            self.high = true;
            true
        } else {
            false
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn reset(&mut self) {
        self.high = false;
    }
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self::new()
    }
}
