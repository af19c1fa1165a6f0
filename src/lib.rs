//! # Tapemachine: Clocked Shift-Register Voltages
//!
//! `tapemachine` is a Rust library implementing a 16-bit shift-register module
//! for modular synthesis. On every clock edge the register rotates, its edge
//! bit flips with a configurable probability, and clear/set controls can force
//! bits low or high. From the register word the module derives four stepped
//! control voltages (direct, flipped, min, max) and sixteen per-bit gate
//! outputs.
//!
//! ## Architecture
//!
//! - **Register** - the 16-bit word and its clocked transition ([`register`])
//! - **Signals** - the four derived voltages and their output ranges ([`signals`], [`range`])
//! - **Pulses** - trigger, clock-passthrough and hold disciplines for the bit outputs ([`pulse`])
//! - **Module** - throttled panel sampling, input overrides and the host boundary ([`modules`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tapemachine::prelude::*;
//!
//! let mut tm = TapeMachine::new(44100.0);
//! tm.set_bit_mode(PulseMode::Trigger);
//! tm.set_range(DerivedOutput::Direct, CvRange::new(0.0, 5.0));
//! tm.set_param(Param::Probability.id(), 0.75);
//!
//! // A rising clock edge steps the register
//! tm.process(&InputFrame::with_clock(0.0));
//! let frame = tm.process(&InputFrame::with_clock(10.0));
//! println!("voltage: {:.3}V, bit 15: {:.1}V", frame.signals.direct, frame.bits[15]);
//! ```

pub mod config;
pub mod io;
pub mod modules;
pub mod port;
pub mod pulse;
pub mod range;
pub mod register;
pub mod rng;
pub mod sampler;
pub mod serialize;
pub mod signals;
pub mod trigger;

/// Prelude module for convenient imports
pub mod prelude {
    // Host boundary
    pub use crate::port::{
        GraphModule, ParamDef, ParamId, ParamRange, PortDef, PortId, PortSpec, PortValues,
        SignalKind,
    };

    // Register core
    pub use crate::register::{
        bit_mask, sweep_mask, Direction, ShiftAmount, ShiftRegister, Step, TransitionConfig,
        REGISTER_BITS,
    };

    // Derived outputs
    pub use crate::range::CvRange;
    pub use crate::signals::{derive, DerivedOutput, DerivedSignals, Normalized, OutputRanges};

    // Pulse shaping
    pub use crate::pulse::{
        ChannelState, PulseGenerator, PulseInput, PulseMode, PulseOutput, PulseShaper,
        PulseTiming,
    };

    // Module
    pub use crate::config::{TapeMachineConfig, Variant};
    pub use crate::io::{AtomicF64, ControlPanel};
    pub use crate::modules::{
        Input, InputFrame, Lights, Output, OutputFrame, Param, TapeMachine, DEFAULT_SAMPLE_RATE,
    };
    pub use crate::sampler::{ParamSampler, DEFAULT_PARAM_INTERVAL};
    pub use crate::trigger::SchmittTrigger;

    // Persistence and randomness
    #[cfg(feature = "rand")]
    pub use crate::rng::RandSource;
    pub use crate::rng::{Rng, UniformSource};
    pub use crate::serialize::{PersistError, RangePatch, StatePatch, TapeMachineData};
}

// Re-export key types at crate root for convenience
pub use prelude::*;
