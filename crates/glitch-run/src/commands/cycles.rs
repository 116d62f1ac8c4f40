use std::error::Error;

use clap::Args;
use glitch_core::ClockTranslator;

#[derive(Args, Debug)]
pub struct CyclesArgs {
    /// Generator clock frequency in hertz.
    #[arg(long, default_value_t = 200_000_000)]
    pub freq_hz: u64,
    /// Durations in nanoseconds.
    #[arg(required = true, num_args = 1..)]
    pub durations_ns: Vec<u64>,
}

pub fn run(args: &CyclesArgs) -> Result<(), Box<dyn Error>> {
    let clock = ClockTranslator::new(args.freq_hz)?;
    println!(
        "clock {} Hz, {} ns per cycle",
        clock.freq_hz(),
        clock.ns_per_cycle()
    );
    println!("{:>12} {:>10} {:>14} {:>9}", "ns", "cycles", "programmed_ns", "lost_ns");
    for &ns in &args.durations_ns {
        let cycles = clock.to_cycles(ns);
        println!(
            "{:>12} {:>10} {:>14} {:>9}",
            ns,
            cycles,
            clock.programmed_ns(cycles),
            clock.quantization_error_ns(ns)
        );
    }
    Ok(())
}
