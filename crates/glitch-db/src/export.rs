//! JSON and CSV dumps of a run database.

use std::fs;
use std::path::Path;

use glitch_core::{ErrorInfo, GlitchError, OutcomeTally, RunMetadata, TrialRecord};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::schema::{load_metadata, load_trials};

/// Everything stored for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDump {
    /// Metadata rows, one per run start.
    pub metadata: Vec<RunMetadata>,
    /// Trials in insertion order.
    pub trials: Vec<TrialRecord>,
    /// Outcome counts over `trials`.
    pub tally: OutcomeTally,
}

impl RunDump {
    /// Reads the whole database.
    pub fn load(conn: &Connection) -> Result<Self, GlitchError> {
        let metadata = load_metadata(conn)?;
        let trials = load_trials(conn)?;
        let tally = trials.iter().map(|trial| trial.outcome).collect();
        Ok(Self {
            metadata,
            trials,
            tally,
        })
    }
}

/// Writes the [`RunDump`] as pretty-printed JSON.
pub fn export_json(conn: &Connection, out_path: &Path) -> Result<(), GlitchError> {
    let dump = RunDump::load(conn)?;
    let bytes = serde_json::to_vec_pretty(&dump).map_err(|err| {
        GlitchError::Serde(ErrorInfo::new("glitch_db.export", err.to_string()))
    })?;
    fs::write(out_path, bytes).map_err(|err| {
        GlitchError::Serde(
            ErrorInfo::new("glitch_db.export", err.to_string())
                .with_path(out_path),
        )
    })
}

/// Writes the trials as CSV to `out_path`, see [`write_csv`].
pub fn export_csv(conn: &Connection, out_path: &Path) -> Result<(), GlitchError> {
    let mut wtr = csv::Writer::from_path(out_path).map_err(|err| {
        GlitchError::Serde(
            ErrorInfo::new("glitch_db.export", err.to_string())
                .with_path(out_path),
        )
    })?;
    write_csv(conn, &mut wtr)?;
    wtr.flush()
        .map_err(|err| GlitchError::Serde(ErrorInfo::new("glitch_db.export", err.to_string())))
}

/// Writes a header and one row per trial; responses are hex encoded.
pub fn write_csv<W: std::io::Write>(
    conn: &Connection,
    wtr: &mut csv::Writer<W>,
) -> Result<(), GlitchError> {
    wtr.write_record(["id", "delay", "length", "color", "clock", "response"])
        .map_err(|err| GlitchError::Serde(ErrorInfo::new("glitch_db.export", err.to_string())))?;
    for trial in load_trials(conn)? {
        wtr.write_record([
            trial.trial_id.to_string(),
            trial.delay_ns.to_string(),
            trial.length_ns.to_string(),
            trial.outcome.code().to_string(),
            trial.clock_hz.map(|hz| hz.to_string()).unwrap_or_default(),
            hex::encode(trial.raw_response.as_bytes()),
        ])
        .map_err(|err| GlitchError::Serde(ErrorInfo::new("glitch_db.export", err.to_string())))?;
    }
    Ok(())
}
