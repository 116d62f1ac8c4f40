use std::error::Error;
use std::io::stderr;

use clap::{Parser, Subcommand};
use commands::{
    classify::{self, ClassifyArgs},
    cycles::{self, CyclesArgs},
    dry_run::{self, DryRunArgs},
    records::{self, RecordsArgs},
    summary::{self, SummaryArgs},
};
use tracing::{trace, Level};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, registry, Layer};

mod commands;
mod paint;

#[derive(Parser, Debug)]
#[command(name = "glitch-run", about = "Glitch timing and target synchronisation driver")]
struct Cli {
    /// Minimum level of log events written to stderr.
    #[arg(long, global = true, default_value_t = Level::INFO)]
    log_level: Level,
    /// Print without terminal colours.
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate nanosecond durations into generator clock cycles.
    Cycles(CyclesArgs),
    /// Classify a target response against the expected bytes.
    Classify(ClassifyArgs),
    /// Run scripted trials against simulated hardware and record them.
    DryRun(DryRunArgs),
    /// Dump the trials stored in a run database.
    Records(RecordsArgs),
    /// Print the outcome tally of a run database.
    Summary(SummaryArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    registry()
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_filter(LevelFilter::from_level(cli.log_level)),
        )
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    trace!("parsed arguments: {:?}", cli);

    match cli.command {
        Command::Cycles(args) => cycles::run(&args),
        Command::Classify(args) => classify::run(&args),
        Command::DryRun(args) => dry_run::run(&args),
        Command::Records(args) => records::run(&args),
        Command::Summary(args) => summary::run(&args),
    }
}
