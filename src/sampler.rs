//! Throttled parameter sampling.
//!
//! Panel controls change slowly, so they are read once every `interval`
//! ticks instead of every tick. A value written to the panel is picked up at
//! most `interval - 1` ticks later.

/// Default number of ticks between panel reads
pub const DEFAULT_PARAM_INTERVAL: usize = 64;

/// Countdown deciding which ticks read the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSampler {
    interval: usize,
    countdown: usize,
}

impl ParamSampler {
    /// Create a sampler that fires on the first tick and every `interval` ticks after.
    ///
    /// An interval of zero is treated as one (sample every tick).
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            countdown: 0,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Advance one tick; returns whether the panel should be read now
    #[inline]
    pub fn due(&mut self) -> bool {
        if self.countdown == 0 {
            self.countdown = self.interval - 1;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }

    /// Make the next tick sample
    pub fn reset(&mut self) {
        self.countdown = 0;
    }
}

impl Default for ParamSampler {
    fn default() -> Self {
        Self::new(DEFAULT_PARAM_INTERVAL)
    }
}
