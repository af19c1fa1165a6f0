//! Random Gates Example
//!
//! Clocks a tape machine for a few bars and prints the register and derived
//! voltages on every step.
//!
//! Run with: cargo run --example random_gates

use tapemachine::prelude::*;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let sample_rate = 1000.0;
    let config = TapeMachineConfig::default().with_param_interval(16);
    let mut tm = TapeMachine::with_source(sample_rate, config, Rng::from_seed(2024));

    tm.set_bit_mode(PulseMode::Trigger);
    tm.set_range(DerivedOutput::Direct, CvRange::new(0.0, 5.0));
    tm.set_param(Param::Probability.id(), 0.6);
    tm.set_param(Param::Shift.id(), 1.0);

    // 120 BPM sixteenth notes: 125 samples per step
    let step_len = 125;
    for step in 0..32 {
        for i in 0..step_len {
            let clock = if i < step_len / 2 { 10.0 } else { 0.0 };
            let frame = *tm.process(&InputFrame::with_clock(clock));
            if i == 0 {
                let gates: String = frame
                    .bits
                    .iter()
                    .rev()
                    .map(|&v| if v > 0.0 { '#' } else { '.' })
                    .collect();
                println!(
                    "step {:2}  {}  voltage {:+.3}V  min {:+.3}V  max {:+.3}V  event {:.0}V",
                    step,
                    gates,
                    frame.signals.direct,
                    frame.signals.min,
                    frame.signals.max,
                    frame.random_pulse,
                );
            }
        }
    }

    #[cfg(feature = "alloc")]
    print_state(&tm);
}

#[cfg(feature = "alloc")]
fn print_state(tm: &TapeMachine) {
    match tm.data().to_json() {
        Ok(json) => println!("saved state:\n{}", json),
        Err(e) => eprintln!("failed to save state: {}", e),
    }
}
