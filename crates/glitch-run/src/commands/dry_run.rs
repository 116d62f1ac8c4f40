use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use glitch_core::TrialParameters;
use glitch_ctl::{
    GlitchSession, ScriptedChannel, SessionConfig, SimulatedGenerator, SimulatedResetLine,
};
use glitch_db::{RecorderConfig, SqliteRecorder};
use serde::Deserialize;
use tracing::{info, warn};

use crate::paint;

#[derive(Args, Debug)]
pub struct DryRunArgs {
    /// YAML session configuration (generator, serial, resync, classifier, recorder).
    #[arg(long)]
    pub config: PathBuf,
    /// YAML script of trials and the target output each one produces.
    #[arg(long)]
    pub script: PathBuf,
    /// Record into this database instead of a fresh timestamped one.
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DryRunConfig {
    #[serde(flatten)]
    session: SessionConfig,
    #[serde(default)]
    recorder: RecorderConfig,
}

#[derive(Debug, Deserialize)]
struct TrialScript {
    /// Bytes sent to the target after arming.
    stimulus: String,
    /// Response of an unglitched target.
    expected: String,
    trials: Vec<ScriptedTrial>,
}

#[derive(Debug, Deserialize)]
struct ScriptedTrial {
    delay_ns: u64,
    length_ns: u64,
    /// Chunks the target prints after reset, one per read.
    #[serde(default)]
    boot: Vec<String>,
    /// What the target answers to the stimulus, readable once it has been sent.
    #[serde(default)]
    response: String,
}

pub fn run(args: &DryRunArgs) -> Result<(), Box<dyn Error>> {
    let config: DryRunConfig = serde_yaml::from_str(&fs::read_to_string(&args.config)?)?;
    config.session.validate()?;
    let script: TrialScript = serde_yaml::from_str(&fs::read_to_string(&args.script)?)?;

    let argv: Vec<String> = env::args().collect();
    let recorder = match &args.db {
        Some(path) => SqliteRecorder::open(path, &config.recorder, &argv)?,
        None => SqliteRecorder::create(&config.recorder, &argv)?,
    };
    let db_path = recorder.path().to_path_buf();

    let mut session = GlitchSession::new(
        &config.session,
        SimulatedGenerator::new(config.session.generator.clock_hz),
        ScriptedChannel::new(config.session.serial.timeout()),
        SimulatedResetLine::new(),
        recorder,
    )?;

    for (idx, trial) in script.trials.iter().enumerate() {
        let channel = session.channel_mut();
        channel.clear();
        for chunk in &trial.boot {
            channel.push_chunk(chunk.as_bytes().to_vec());
        }
        channel.push_reply(trial.response.as_bytes().to_vec());

        let params = TrialParameters::new(trial.delay_ns, trial.length_ns);
        match session.run_trial(
            idx as u64,
            params,
            script.stimulus.as_bytes(),
            script.expected.as_bytes(),
        ) {
            Ok(record) => {
                let line = format!(
                    "{:>6} delay={:<8} length={:<6} {:<13} {:?}",
                    record.trial_id,
                    record.delay_ns,
                    record.length_ns,
                    record.outcome.to_string(),
                    String::from_utf8_lossy(record.raw_response.as_bytes())
                );
                println!("{}", paint::outcome(record.outcome, &line));
            }
            Err(err) if !err.is_fatal_for_run() => {
                warn!(trial_id = idx, error = %err, "trial skipped");
            }
            Err(err) => return Err(Box::new(err)),
        }
    }

    let speed = session
        .throughput()
        .map(|per_second| per_second.to_string())
        .unwrap_or_else(|| "NA".to_string());
    let tally = session.close()?;
    info!(database = %db_path.display(), trials = tally.total(), "dry run finished");
    println!("database: {}", db_path.display());
    println!("trials/s: {speed}");
    for (outcome, count) in tally.iter() {
        let label = format!("{:<13}", outcome.to_string());
        println!("  {} {}", paint::outcome(outcome, &label), count);
    }
    Ok(())
}

