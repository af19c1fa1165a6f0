//! Tape Machine Module
//!
//! [`TapeMachine`] wires the shift register, the derived outputs and the pulse
//! channels to the host boundary. Once per sample it:
//!
//! 1. reads the panel, if the throttled sampler says so
//! 2. applies per-tick input overrides (shift CV, direction toggle, clear/set gates)
//! 3. detects a clock edge and steps the register
//! 4. derives the four scalar voltages
//! 5. shapes the sixteen bit outputs and the event-pulse output
//!
//! This order is fixed: each stage reads state written by the ones before it.

use crate::config::{TapeMachineConfig, Variant};
use crate::io::ControlPanel;
use crate::port::{
    GraphModule, ParamDef, ParamId, ParamRange, PortDef, PortId, PortSpec, PortValues, SignalKind,
};
use crate::pulse::{PulseInput, PulseMode, PulseShaper, PulseTiming};
use crate::range::CvRange;
use crate::register::{Direction, ShiftAmount, ShiftRegister, TransitionConfig, REGISTER_BITS};
use crate::rng::{Rng, UniformSource};
use crate::sampler::ParamSampler;
use crate::serialize::{StatePatch, TapeMachineData};
use crate::signals::{derive, DerivedOutput, DerivedSignals, OutputRanges};
use crate::trigger::SchmittTrigger;
use std::sync::Arc;

/// Rate assumed when a host supplies an unusable one
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Seconds per tick, or `None` unless `sample_rate` is positive and finite
fn sample_period(sample_rate: f64) -> Option<f64> {
    (sample_rate.is_finite() && sample_rate > 0.0).then(|| 1.0 / sample_rate)
}

/// Panel controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Probability,
    Clear,
    Set,
    Shift,
    Direction,
}

impl Param {
    pub const fn id(self) -> ParamId {
        match self {
            Param::Probability => 0,
            Param::Clear => 1,
            Param::Set => 2,
            Param::Shift => 3,
            Param::Direction => 4,
        }
    }

    fn def(self) -> ParamDef {
        let switch = ParamRange::Stepped { min: 0.0, max: 1.0 };
        match self {
            Param::Probability => ParamDef::new(
                self.id(),
                "probability",
                0.5,
                ParamRange::Linear { min: 0.0, max: 1.0 },
            ),
            Param::Clear => ParamDef::new(self.id(), "clear", 0.0, switch),
            Param::Set => ParamDef::new(self.id(), "set", 0.0, switch),
            Param::Shift => ParamDef::new(
                self.id(),
                "shift",
                1.0,
                ParamRange::Stepped {
                    min: 1.0,
                    max: 15.0,
                },
            ),
            Param::Direction => ParamDef::new(self.id(), "direction", 0.0, switch),
        }
    }
}

/// Input ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Clock,
    Clear,
    Set,
    Shift,
    Direction,
}

impl Input {
    pub const fn id(self) -> PortId {
        match self {
            Input::Clock => 0,
            Input::Clear => 1,
            Input::Set => 2,
            Input::Shift => 3,
            Input::Direction => 4,
        }
    }
}

/// Output ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Voltage,
    Flipped,
    Min,
    Max,
    RandomPulse,
    /// Gate/trigger output of one register bit (0–15)
    Bit(u32),
}

impl Output {
    pub const fn id(self) -> PortId {
        match self {
            Output::Voltage => 10,
            Output::Flipped => 11,
            Output::Min => 12,
            Output::Max => 13,
            Output::RandomPulse => 14,
            Output::Bit(index) => 20 + index,
        }
    }
}

/// Input levels for one tick
///
/// `shift` and `direction` are `None` when unpatched; an unpatched gate reads 0V.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputFrame {
    pub clock: f64,
    pub clear: f64,
    pub set: f64,
    pub shift: Option<f64>,
    pub direction: Option<f64>,
}

impl InputFrame {
    pub fn with_clock(clock: f64) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    pub fn from_ports(inputs: &PortValues) -> Self {
        Self {
            clock: inputs.get_or(Input::Clock.id(), 0.0),
            clear: inputs.get_or(Input::Clear.id(), 0.0),
            set: inputs.get_or(Input::Set.id(), 0.0),
            shift: inputs.get(Input::Shift.id()),
            direction: inputs.get(Input::Direction.id()),
        }
    }
}

/// Indicator brightness levels (0–1)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lights {
    pub bits: [f64; REGISTER_BITS],
    pub clear: f64,
    pub set: f64,
}

/// Everything a tick produces
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputFrame {
    pub signals: DerivedSignals,
    pub bits: [f64; REGISTER_BITS],
    pub random_pulse: f64,
    pub lights: Lights,
}

/// Clocked 16-bit shift register with stepped voltages and per-bit gates
pub struct TapeMachine<S = Rng> {
    config: TapeMachineConfig,
    timing: PulseTiming,
    sample_time: f64,
    register: ShiftRegister,
    transition: TransitionConfig,
    panel: Arc<ControlPanel>,
    sampler: ParamSampler,
    clock: SchmittTrigger,
    direction_trigger: SchmittTrigger,
    clear_knob: bool,
    set_knob: bool,
    knob_shift: ShiftAmount,
    ranges: OutputRanges,
    bit_mode: PulseMode,
    random_mode: PulseMode,
    bit_pulses: [PulseShaper; REGISTER_BITS],
    random_pulse: PulseShaper,
    source: S,
    last: OutputFrame,
    spec: PortSpec,
}

impl TapeMachine<Rng> {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_config(sample_rate, TapeMachineConfig::default())
    }

    pub fn with_config(sample_rate: f64, config: TapeMachineConfig) -> Self {
        Self::with_source(sample_rate, config, Rng::default())
    }
}

impl<S: UniformSource> TapeMachine<S> {
    /// Create a module drawing its flip decisions from `source`
    pub fn with_source(sample_rate: f64, config: TapeMachineConfig, source: S) -> Self {
        let config = config.sanitized();
        let params: Vec<ParamDef> = Self::param_list(config.variant)
            .iter()
            .map(|param| param.def())
            .collect();
        let sample_time = sample_period(sample_rate).unwrap_or_else(|| {
            tracing::warn!(sample_rate, "invalid sample rate; using {} Hz", DEFAULT_SAMPLE_RATE);
            1.0 / DEFAULT_SAMPLE_RATE
        });

        Self {
            timing: config.pulse_timing(),
            sample_time,
            register: ShiftRegister::new(),
            transition: TransitionConfig::default(),
            panel: ControlPanel::shared(params),
            sampler: ParamSampler::new(config.param_interval),
            clock: SchmittTrigger::new(),
            direction_trigger: SchmittTrigger::new(),
            clear_knob: false,
            set_knob: false,
            knob_shift: ShiftAmount::MIN,
            ranges: OutputRanges::default(),
            bit_mode: PulseMode::default(),
            random_mode: PulseMode::default(),
            bit_pulses: [PulseShaper::new(); REGISTER_BITS],
            random_pulse: PulseShaper::new(),
            source,
            last: OutputFrame::default(),
            spec: Self::build_spec(config.variant),
            config,
        }
    }

    fn param_list(variant: Variant) -> &'static [Param] {
        match variant {
            Variant::Basic => &[Param::Probability, Param::Clear, Param::Set, Param::Shift],
            Variant::Extended => &[
                Param::Probability,
                Param::Clear,
                Param::Set,
                Param::Shift,
                Param::Direction,
            ],
        }
    }

    fn build_spec(variant: Variant) -> PortSpec {
        let mut inputs = vec![
            PortDef::new(Input::Clock.id(), "clock", SignalKind::Clock),
            PortDef::new(Input::Clear.id(), "clear", SignalKind::Gate),
            PortDef::new(Input::Set.id(), "set", SignalKind::Gate),
            PortDef::new(Input::Shift.id(), "shift", SignalKind::CvUnipolar),
        ];
        let mut outputs = vec![
            PortDef::new(Output::Voltage.id(), "voltage", SignalKind::CvBipolar),
            PortDef::new(Output::Flipped.id(), "flipped", SignalKind::CvBipolar),
            PortDef::new(Output::Min.id(), "min", SignalKind::CvBipolar),
            PortDef::new(Output::Max.id(), "max", SignalKind::CvBipolar),
        ];
        if variant == Variant::Extended {
            inputs.push(PortDef::new(
                Input::Direction.id(),
                "direction",
                SignalKind::Trigger,
            ));
            outputs.push(PortDef::new(
                Output::RandomPulse.id(),
                "random_pulse",
                SignalKind::Trigger,
            ));
        }
        for index in 0..REGISTER_BITS as u32 {
            outputs.push(PortDef::new(
                Output::Bit(index).id(),
                format!("bit{}", index),
                SignalKind::Gate,
            ));
        }
        PortSpec { inputs, outputs }
    }

    pub fn config(&self) -> &TapeMachineConfig {
        &self.config
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    /// Shared handle to the panel controls
    pub fn panel(&self) -> &Arc<ControlPanel> {
        &self.panel
    }

    pub fn register(&self) -> &ShiftRegister {
        &self.register
    }

    /// Transition settings in effect for the next clock edge
    pub fn transition(&self) -> &TransitionConfig {
        &self.transition
    }

    pub fn bit_mode(&self) -> PulseMode {
        self.bit_mode
    }

    pub fn set_bit_mode(&mut self, mode: PulseMode) {
        tracing::debug!(%mode, "bit pulse mode changed");
        self.bit_mode = mode;
    }

    pub fn random_mode(&self) -> PulseMode {
        self.random_mode
    }

    pub fn set_random_mode(&mut self, mode: PulseMode) {
        tracing::debug!(%mode, "random pulse mode changed");
        self.random_mode = mode;
    }

    pub fn ranges(&self) -> &OutputRanges {
        &self.ranges
    }

    pub fn range(&self, output: DerivedOutput) -> CvRange {
        *self.ranges.get(output)
    }

    pub fn set_range(&mut self, output: DerivedOutput, range: CvRange) {
        tracing::debug!(?output, low = range.low, high = range.high, "output range changed");
        *self.ranges.get_mut(output) = range;
    }

    /// Outputs of the most recent tick
    pub fn last_output(&self) -> &OutputFrame {
        &self.last
    }

    pub fn lights(&self) -> &Lights {
        &self.last.lights
    }

    fn sample_panel(&mut self) {
        let panel = &self.panel;
        let read = |param: Param| panel.get(param.id());

        if let Some(probability) = read(Param::Probability) {
            self.transition.probability = probability;
        }
        if let Some(clear) = read(Param::Clear) {
            self.clear_knob = clear > 0.0;
        }
        if let Some(set) = read(Param::Set) {
            self.set_knob = set > 0.0;
        }
        if let Some(shift) = read(Param::Shift) {
            self.knob_shift = ShiftAmount::from_knob(shift);
        }
        self.transition.direction = match self.config.variant {
            Variant::Basic => Direction::RightToLeft,
            Variant::Extended => read(Param::Direction)
                .map(Direction::from_switch)
                .unwrap_or_default(),
        };
    }

    /// Process one tick
    pub fn process(&mut self, input: &InputFrame) -> &OutputFrame {
        if self.sampler.due() {
            self.sample_panel();
        }

        self.transition.shift = match input.shift {
            Some(volts) => ShiftAmount::from_cv(volts),
            None => self.knob_shift,
        };

        if self.config.variant == Variant::Extended {
            if let Some(level) = input.direction {
                if self.direction_trigger.process(level) {
                    let direction = self.transition.direction.toggled();
                    tracing::trace!(?direction, "direction toggled");
                    self.transition.direction = direction;
                    self.panel.set(Param::Direction.id(), direction.as_switch());
                }
            }
        }

        self.transition.clear = self.clear_knob || input.clear > self.config.gate_threshold;
        self.transition.set = self.set_knob || input.set > self.config.gate_threshold;

        let noise = self.source.next_uniform();
        let edge = self.clock.process(input.clock);
        self.register.step(edge, &self.transition, noise);

        let bits = self.register.bits();
        let mut frame = OutputFrame {
            signals: derive(bits, &self.ranges),
            ..OutputFrame::default()
        };
        frame.lights.clear = if self.transition.clear { 1.0 } else { 0.0 };
        frame.lights.set = if self.transition.set { 1.0 } else { 0.0 };

        for (index, shaper) in self.bit_pulses.iter_mut().enumerate() {
            let pulse = PulseInput {
                edge,
                condition: self.register.is_set(index as u32),
                clock: input.clock,
            };
            let out = shaper.step(self.bit_mode, pulse, &self.timing, self.sample_time);
            frame.bits[index] = out.voltage;
            frame.lights.bits[index] = out.light;
        }

        if self.config.variant == Variant::Extended {
            let pulse = PulseInput {
                edge,
                condition: self.register.last_flip(),
                clock: input.clock,
            };
            frame.random_pulse = self
                .random_pulse
                .step(self.random_mode, pulse, &self.timing, self.sample_time)
                .voltage;
        }

        self.last = frame;
        &self.last
    }

    /// Snapshot of the persisted fields
    pub fn data(&self) -> TapeMachineData {
        TapeMachineData::new(self.bit_mode.index(), self.random_mode.index(), &self.ranges)
    }

    /// Apply a persisted document; absent fields keep their current values
    pub fn restore(&mut self, patch: &StatePatch) {
        if let Some(index) = patch.bit_pulse_mode {
            self.bit_mode = Self::decode_mode("bit_pulse_mode", index);
        }
        if let Some(index) = patch.random_pulse_mode {
            self.random_mode = Self::decode_mode("random_pulse_mode", index);
        }
        patch.apply_ranges(&mut self.ranges);
        tracing::debug!(
            bit_mode = %self.bit_mode,
            random_mode = %self.random_mode,
            "state restored"
        );
    }

    fn decode_mode(field: &str, index: usize) -> PulseMode {
        let mode = PulseMode::from_index(index);
        if mode.index() != index {
            tracing::warn!(field, index, "unknown pulse mode index; using clock");
        }
        mode
    }

    /// Clear the register, output ranges, pulse modes and pulse channels.
    ///
    /// Panel positions are left alone; they belong to the host.
    pub fn reset_state(&mut self) {
        self.register.reset();
        self.ranges = OutputRanges::default();
        self.bit_mode = PulseMode::default();
        self.random_mode = PulseMode::default();
        for shaper in self.bit_pulses.iter_mut() {
            shaper.reset();
        }
        self.random_pulse.reset();
        self.clock.reset();
        self.direction_trigger.reset();
        self.sampler.reset();
        self.last = OutputFrame::default();
        tracing::debug!("tape machine reset");
    }

    fn write_outputs(&self, outputs: &mut PortValues) {
        let frame = &self.last;
        outputs.set(Output::Voltage.id(), frame.signals.direct);
        outputs.set(Output::Flipped.id(), frame.signals.flipped);
        outputs.set(Output::Min.id(), frame.signals.min);
        outputs.set(Output::Max.id(), frame.signals.max);
        if self.config.variant == Variant::Extended {
            outputs.set(Output::RandomPulse.id(), frame.random_pulse);
        }
        for (index, &voltage) in frame.bits.iter().enumerate() {
            outputs.set(Output::Bit(index as u32).id(), voltage);
        }
    }
}

impl Default for TapeMachine<Rng> {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl<S: UniformSource + Send + Sync> GraphModule for TapeMachine<S> {
    fn port_spec(&self) -> &PortSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        self.process(&InputFrame::from_ports(inputs));
        self.write_outputs(outputs);
    }

    fn reset(&mut self) {
        self.reset_state();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        match sample_period(sample_rate) {
            Some(period) => self.sample_time = period,
            None => tracing::warn!(sample_rate, "ignoring invalid sample rate"),
        }
    }

    fn params(&self) -> &[ParamDef] {
        self.panel.defs()
    }

    fn get_param(&self, id: ParamId) -> Option<f64> {
        self.panel.get(id)
    }

    fn set_param(&mut self, id: ParamId, value: f64) {
        self.panel.set(id, value);
    }

    fn type_id(&self) -> &'static str {
        match self.config.variant {
            Variant::Basic => "tape_machine_basic",
            Variant::Extended => "tape_machine",
        }
    }

    #[cfg(feature = "alloc")]
    fn serialize_state(&self) -> Option<serde_json::Value> {
        Some(self.data().to_value())
    }

    #[cfg(feature = "alloc")]
    fn deserialize_state(&mut self, state: &serde_json::Value) -> Result<(), String> {
        let patch = StatePatch::from_value(state).map_err(|e| e.to_string())?;
        self.restore(&patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::GATE_VOLTAGE;
    use approx::assert_relative_eq;

    /// Replays a fixed list of samples, cycling
    struct Script {
        values: Vec<f64>,
        pos: usize,
    }

    impl Script {
        fn constant(value: f64) -> Self {
            Self::new(vec![value])
        }

        fn new(values: Vec<f64>) -> Self {
            Self { values, pos: 0 }
        }
    }

    impl UniformSource for Script {
        fn next_uniform(&mut self) -> f64 {
            let value = self.values[self.pos % self.values.len()];
            self.pos += 1;
            value
        }
    }

    fn machine(noise: f64) -> TapeMachine<Script> {
        TapeMachine::with_source(1000.0, TapeMachineConfig::default(), Script::constant(noise))
    }

    /// One low tick followed by one high tick
    fn clock_pulse<S: UniformSource>(tm: &mut TapeMachine<S>, frame: InputFrame) -> OutputFrame {
        tm.process(&InputFrame { clock: 0.0, ..frame });
        *tm.process(&InputFrame { clock: 10.0, ..frame })
    }

    #[test]
    fn test_defaults() {
        let tm = machine(0.0);
        assert_eq!(tm.register().bits(), 0);
        assert_eq!(tm.bit_mode(), PulseMode::Clock);
        assert_eq!(tm.random_mode(), PulseMode::Clock);
        for output in DerivedOutput::ALL {
            assert_eq!(tm.range(output), CvRange::new(-1.0, 1.0));
        }
        assert_eq!(tm.type_id(), "tape_machine");
        assert_eq!(tm.params().len(), 5);
    }

    #[test]
    fn test_no_flip_below_probability() {
        let mut tm = machine(0.1);
        for _ in 0..8 {
            clock_pulse(&mut tm, InputFrame::default());
        }
        assert_eq!(tm.register().bits(), 0);
    }

    #[test]
    fn test_flip_fills_register_from_the_top() {
        let mut tm = machine(0.9);
        clock_pulse(&mut tm, InputFrame::default());
        assert_eq!(tm.register().bits(), 0x8000);
        clock_pulse(&mut tm, InputFrame::default());
        assert_eq!(tm.register().bits(), 0xC000);
        assert!(tm.register().last_flip());
    }

    #[test]
    fn test_switch_up_fills_register_from_the_bottom() {
        let mut tm = machine(0.9);
        tm.set_param(Param::Direction.id(), 1.0);
        clock_pulse(&mut tm, InputFrame::default());
        assert_eq!(tm.register().bits(), 0x0001);
        clock_pulse(&mut tm, InputFrame::default());
        assert_eq!(tm.register().bits(), 0x0003);
    }

    #[test]
    fn test_clear_button_erases_inserted_bit() {
        for config in [TapeMachineConfig::default(), TapeMachineConfig::basic()] {
            let mut tm = TapeMachine::with_source(1000.0, config, Script::constant(0.9));
            tm.set_param(Param::Clear.id(), 1.0);

            let step = clock_pulse(&mut tm, InputFrame::default());
            assert!(tm.register().last_flip());
            assert_eq!(tm.register().bits(), 0x0000, "{:?}", tm.variant());
            assert_eq!(step.lights.clear, 1.0);
        }
    }

    #[test]
    fn test_held_clock_steps_once() {
        let mut tm = machine(0.9);
        for _ in 0..10 {
            tm.process(&InputFrame::with_clock(10.0));
        }
        assert_eq!(tm.register().bits(), 0x8000);
    }

    #[test]
    fn test_set_knob_forces_sweep() {
        let mut tm = machine(0.0);
        tm.set_param(Param::Set.id(), 1.0);
        tm.set_param(Param::Shift.id(), 2.0);

        let out = clock_pulse(&mut tm, InputFrame::default());
        assert_eq!(tm.register().bits(), 0xC000);
        assert_eq!(out.lights.set, 1.0);
        assert_eq!(out.lights.clear, 0.0);
    }

    #[test]
    fn test_clear_input_threshold_is_strict() {
        let mut tm = machine(0.0);
        tm.register.load(0xFFFF);

        let at_threshold = InputFrame {
            clear: 5.0,
            ..InputFrame::default()
        };
        let out = clock_pulse(&mut tm, at_threshold);
        assert_eq!(tm.register().bits(), 0xFFFF);
        assert_eq!(out.lights.clear, 0.0);

        let above = InputFrame {
            clear: 5.1,
            ..InputFrame::default()
        };
        let out = clock_pulse(&mut tm, above);
        assert_eq!(tm.register().bits(), 0x7FFF);
        assert_eq!(out.lights.clear, 1.0);
    }

    #[test]
    fn test_knob_changes_wait_for_sampling_cadence() {
        let mut tm = machine(0.0);
        tm.process(&InputFrame::default());
        assert_eq!(tm.transition().probability, 0.5);

        tm.set_param(Param::Probability.id(), 0.0);
        for _ in 1..64 {
            tm.process(&InputFrame::default());
            assert_eq!(tm.transition().probability, 0.5);
        }
        // Tick 64 reads the panel
        tm.process(&InputFrame::default());
        assert_eq!(tm.transition().probability, 0.0);
    }

    #[test]
    fn test_shift_cv_overrides_knob_every_tick() {
        let mut tm = machine(0.0);
        tm.set_param(Param::Shift.id(), 9.0);
        tm.process(&InputFrame::default());
        assert_eq!(tm.transition().shift.get(), 9);

        let patched = |volts| InputFrame {
            shift: Some(volts),
            ..InputFrame::default()
        };
        tm.process(&patched(10.0));
        assert_eq!(tm.transition().shift.get(), 15);
        tm.process(&patched(0.0));
        assert_eq!(tm.transition().shift.get(), 1);
        tm.process(&patched(2.0));
        assert_eq!(tm.transition().shift.get(), 3);

        // Unpatched again: back to the knob
        tm.process(&InputFrame::default());
        assert_eq!(tm.transition().shift.get(), 9);
    }

    #[test]
    fn test_direction_input_toggles_and_writes_back() {
        let mut tm = machine(0.0);
        tm.process(&InputFrame::default());
        assert_eq!(tm.transition().direction, Direction::RightToLeft);

        let gate = |level| InputFrame {
            direction: Some(level),
            ..InputFrame::default()
        };
        tm.process(&gate(10.0));
        assert_eq!(tm.transition().direction, Direction::LeftToRight);
        assert_eq!(tm.get_param(Param::Direction.id()), Some(1.0));

        // Held high: no further toggles, and the next panel read agrees
        for _ in 0..128 {
            tm.process(&gate(10.0));
        }
        assert_eq!(tm.transition().direction, Direction::LeftToRight);

        tm.process(&gate(0.0));
        tm.process(&gate(10.0));
        assert_eq!(tm.transition().direction, Direction::RightToLeft);
        assert_eq!(tm.get_param(Param::Direction.id()), Some(0.0));
    }

    #[test]
    fn test_right_to_left_scenario() {
        let mut tm = machine(0.9);
        tm.register.load(0x0001);

        clock_pulse(&mut tm, InputFrame::default());
        assert_eq!(tm.register().bits(), 0x0000);
    }

    #[test]
    fn test_basic_variant_surface() {
        let mut tm = TapeMachine::with_source(1000.0, TapeMachineConfig::basic(), Script::constant(0.9));
        assert_eq!(tm.type_id(), "tape_machine_basic");
        assert_eq!(tm.params().len(), 4);
        assert!(tm.port_spec().input_by_name("direction").is_none());
        assert!(tm.port_spec().output_by_name("random_pulse").is_none());
        assert_eq!(tm.get_param(Param::Direction.id()), None);

        tm.set_random_mode(PulseMode::Hold);
        let frame = InputFrame {
            direction: Some(10.0),
            ..InputFrame::default()
        };
        let out = clock_pulse(&mut tm, frame);
        assert_eq!(tm.transition().direction, Direction::RightToLeft);
        assert_eq!(tm.register().bits(), 0x8000);
        assert_eq!(out.random_pulse, 0.0);
    }

    #[test]
    fn test_derived_outputs_track_register() {
        let mut tm = machine(0.9);
        tm.set_range(DerivedOutput::Direct, CvRange::new(0.0, 10.0));
        let out = clock_pulse(&mut tm, InputFrame::default());

        let expected = derive(0x8000, tm.ranges());
        assert_eq!(out.signals, expected);
        assert_relative_eq!(out.signals.direct, 10.0 * 32768.0 / 65535.0);
    }

    #[test]
    fn test_clock_mode_bits_pass_clock() {
        let mut tm = machine(0.9);
        let out = clock_pulse(&mut tm, InputFrame::default());
        assert_relative_eq!(out.bits[15], 10.0);
        assert_eq!(out.lights.bits[15], 1.0);
        assert_eq!(out.bits[14], 0.0);

        let out = *tm.process(&InputFrame::with_clock(0.3));
        assert_relative_eq!(out.bits[15], 0.3);
        assert_eq!(out.lights.bits[15], 0.0);
    }

    #[test]
    fn test_trigger_mode_bits_pulse_for_ten_ms() {
        let mut tm = machine(0.9);
        tm.set_bit_mode(PulseMode::Trigger);

        let out = clock_pulse(&mut tm, InputFrame::default());
        assert_relative_eq!(out.bits[15], GATE_VOLTAGE);

        // Clock stays high; no new edge
        let high_after = (0..40)
            .filter(|_| tm.process(&InputFrame::with_clock(10.0)).bits[15] > 0.0)
            .count();
        assert_eq!(high_after, 9);
    }

    #[test]
    fn test_hold_mode_bits_follow_register() {
        let mut tm = machine(0.9);
        tm.set_bit_mode(PulseMode::Hold);
        clock_pulse(&mut tm, InputFrame::default());

        let out = *tm.process(&InputFrame::with_clock(0.0));
        assert_relative_eq!(out.bits[15], GATE_VOLTAGE);
        assert_eq!(out.lights.bits[15], 1.0);
        assert!(out.bits[..15].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_random_pulse_modes() {
        // Flip on the first edge, none on the second
        let mut tm = TapeMachine::with_source(
            1000.0,
            TapeMachineConfig::default(),
            Script::new(vec![0.9, 0.9, 0.1, 0.1]),
        );
        tm.set_random_mode(PulseMode::Hold);

        let out = clock_pulse(&mut tm, InputFrame::default());
        assert_relative_eq!(out.random_pulse, GATE_VOLTAGE);

        // Flag persists between edges
        let out = *tm.process(&InputFrame::with_clock(0.0));
        assert_relative_eq!(out.random_pulse, GATE_VOLTAGE);

        let out = *tm.process(&InputFrame::with_clock(10.0));
        assert_eq!(out.random_pulse, 0.0);
    }

    #[test]
    fn test_random_pulse_trigger_mode() {
        let mut tm = machine(0.9);
        tm.set_random_mode(PulseMode::Trigger);

        let out = clock_pulse(&mut tm, InputFrame::default());
        assert_relative_eq!(out.random_pulse, GATE_VOLTAGE);

        let high_after = (0..40)
            .filter(|_| tm.process(&InputFrame::with_clock(10.0)).random_pulse > 0.0)
            .count();
        assert_eq!(high_after, 9);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut tm = machine(0.9);
        tm.set_bit_mode(PulseMode::Trigger);
        tm.set_random_mode(PulseMode::Hold);
        tm.set_range(DerivedOutput::Min, CvRange::new(0.0, 5.0));
        clock_pulse(&mut tm, InputFrame::default());
        assert_ne!(tm.register().bits(), 0);

        GraphModule::reset(&mut tm);
        assert_eq!(tm.register().bits(), 0);
        assert_eq!(tm.bit_mode(), PulseMode::Clock);
        assert_eq!(tm.random_mode(), PulseMode::Clock);
        assert_eq!(*tm.ranges(), OutputRanges::default());
        assert!(tm.bit_pulses.iter().all(|p| p.state() == crate::pulse::ChannelState::Idle));
    }

    #[test]
    fn test_reset_idles_event_channel_and_rearms_clock() {
        let mut tm = machine(0.9);
        tm.set_random_mode(PulseMode::Trigger);
        let out = clock_pulse(&mut tm, InputFrame::default());
        assert_relative_eq!(out.random_pulse, GATE_VOLTAGE);
        assert_eq!(tm.random_pulse.state(), crate::pulse::ChannelState::Pulsing);

        GraphModule::reset(&mut tm);
        assert_eq!(tm.random_pulse.state(), crate::pulse::ChannelState::Idle);
        assert!(!tm.register().last_flip());
        assert_eq!(tm.last_output().random_pulse, 0.0);

        // The clock was left high; after reset the same level is a fresh edge
        tm.set_random_mode(PulseMode::Trigger);
        let out = *tm.process(&InputFrame::with_clock(10.0));
        assert_eq!(tm.register().bits(), 0x8000);
        assert_relative_eq!(out.random_pulse, GATE_VOLTAGE);
    }

    #[test]
    fn test_restore_keeps_missing_fields() {
        let mut tm = machine(0.0);
        tm.set_bit_mode(PulseMode::Hold);
        tm.set_range(DerivedOutput::Max, CvRange::new(0.0, 10.0));

        tm.restore(&StatePatch {
            random_pulse_mode: Some(0),
            ..StatePatch::default()
        });
        assert_eq!(tm.bit_mode(), PulseMode::Hold);
        assert_eq!(tm.random_mode(), PulseMode::Trigger);
        assert_eq!(tm.range(DerivedOutput::Max), CvRange::new(0.0, 10.0));

        tm.restore(&StatePatch {
            bit_pulse_mode: Some(9),
            ..StatePatch::default()
        });
        assert_eq!(tm.bit_mode(), PulseMode::Clock);
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn test_state_round_trip_through_graph_module() {
        let mut source = machine(0.0);
        source.set_bit_mode(PulseMode::Trigger);
        source.set_random_mode(PulseMode::Hold);
        source.set_range(DerivedOutput::Direct, CvRange::new(0.0, 10.0));
        source.set_range(DerivedOutput::Flipped, CvRange::new(-0.1, 0.3));
        let state = source.serialize_state().unwrap();

        let mut target = machine(0.0);
        target.deserialize_state(&state).unwrap();
        assert_eq!(target.data(), source.data());
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn test_deserialize_rejects_non_object() {
        let mut tm = machine(0.0);
        let result = tm.deserialize_state(&serde_json::json!([1, 2]));
        assert!(result.is_err());
        assert_eq!(tm.data(), machine(0.0).data());
    }

    #[test]
    fn test_graph_module_tick() {
        let mut tm = machine(0.9);
        let mut inputs = PortValues::new();
        let mut outputs = PortValues::new();

        tm.tick(&inputs, &mut outputs);
        inputs.set(Input::Clock.id(), 10.0);
        tm.tick(&inputs, &mut outputs);

        assert_eq!(tm.register().bits(), 0x8000);
        assert_relative_eq!(
            outputs.get(Output::Voltage.id()).unwrap(),
            -1.0 + 2.0 * 32768.0 / 65535.0
        );
        assert_relative_eq!(outputs.get(Output::Bit(15).id()).unwrap(), 10.0);
        assert_eq!(outputs.get(Output::Bit(0).id()), Some(0.0));
        assert!(outputs.has(Output::RandomPulse.id()));
        assert_eq!(tm.port_spec().outputs.len(), 5 + REGISTER_BITS);
    }

    #[test]
    fn test_sample_rate_changes_pulse_length() {
        let mut tm = machine(0.9);
        tm.set_sample_rate(2000.0);
        tm.set_bit_mode(PulseMode::Trigger);
        clock_pulse(&mut tm, InputFrame::default());

        let high_after = (0..100)
            .filter(|_| tm.process(&InputFrame::with_clock(10.0)).bits[15] > 0.0)
            .count();
        assert_eq!(high_after, 19);
    }

    #[test]
    fn test_invalid_sample_rates_are_rejected() {
        let tm = TapeMachine::with_source(0.0, TapeMachineConfig::default(), Script::constant(0.9));
        assert_relative_eq!(tm.sample_time, 1.0 / DEFAULT_SAMPLE_RATE);

        let mut tm = machine(0.9);
        tm.set_sample_rate(0.0);
        tm.set_sample_rate(f64::NAN);
        tm.set_sample_rate(-48000.0);
        assert_relative_eq!(tm.sample_time, 1.0 / 1000.0);

        // Trigger length is still 10ms at the last good rate
        tm.set_bit_mode(PulseMode::Trigger);
        clock_pulse(&mut tm, InputFrame::default());
        let high_after = (0..40)
            .filter(|_| tm.process(&InputFrame::with_clock(10.0)).bits[15] > 0.0)
            .count();
        assert_eq!(high_after, 9);
    }
}
