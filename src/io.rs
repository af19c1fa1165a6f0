//! Panel Controls
//!
//! Knob and switch positions are written by a UI or control thread and read
//! by the audio thread at the throttled sampling cadence. Each position is an
//! [`AtomicF64`], so neither side ever blocks.

use crate::port::{ParamDef, ParamId};
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic f64 for lock-free communication between threads
///
/// Uses AtomicU64 internally since there's no native AtomicF64.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicF64 {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

/// Shared set of panel control positions, one slot per [`ParamDef`]
#[derive(Debug)]
pub struct ControlPanel {
    defs: Vec<ParamDef>,
    values: Vec<AtomicF64>,
}

impl ControlPanel {
    /// Create a panel with every control at its default position
    pub fn new(defs: Vec<ParamDef>) -> Self {
        let values = defs.iter().map(|def| AtomicF64::new(def.default)).collect();
        Self { defs, values }
    }

    /// Convenience constructor returning a shareable handle
    pub fn shared(defs: Vec<ParamDef>) -> Arc<Self> {
        Arc::new(Self::new(defs))
    }

    pub fn defs(&self) -> &[ParamDef] {
        &self.defs
    }

    fn slot(&self, id: ParamId) -> Option<(&ParamDef, &AtomicF64)> {
        self.defs
            .iter()
            .position(|def| def.id == id)
            .map(|index| (&self.defs[index], &self.values[index]))
    }

    /// Current position of a control
    pub fn get(&self, id: ParamId) -> Option<f64> {
        self.slot(id).map(|(_, value)| value.get())
    }

    /// Move a control; the value is clamped (and snapped) to the control's range.
    ///
    /// Returns the stored value, or `None` for an unknown id.
    pub fn set(&self, id: ParamId, value: f64) -> Option<f64> {
        let (def, slot) = self.slot(id)?;
        let clamped = def.range.clamp(value);
        slot.set(clamped);
        Some(clamped)
    }
}
