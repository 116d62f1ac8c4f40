//! One SQLite file per run, written through [`glitch_core::TrialRecorder`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use glitch_core::{ErrorInfo, GlitchError, RunMetadata, TrialRecord, TrialRecorder};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::schema::{db_error, init_schema, insert_metadata, insert_trial};

/// How the recorder holds its database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// One connection for the whole run.
    #[default]
    Persistent,
    /// Open, insert and close for every trial so other readers can follow a live run.
    PerInsert,
}

/// Where and how trials are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Directory holding run databases.
    #[serde(default = "RecorderConfig::default_directory")]
    pub directory: PathBuf,
    /// Connection handling.
    #[serde(default)]
    pub mode: ConnectionMode,
    /// Busy timeout applied to each connection, in milliseconds.
    #[serde(default = "RecorderConfig::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl RecorderConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("databases")
    }

    const fn default_busy_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            mode: ConnectionMode::default(),
            busy_timeout_ms: Self::default_busy_timeout_ms(),
        }
    }
}

/// `<program>_<YYYYmmdd_HHMMSS>.sqlite` for the program at `program_path`.
pub fn database_file_name(program_path: &str, started: DateTime<Local>) -> String {
    let program = Path::new(program_path)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("glitch");
    format!("{program}_{}.sqlite", started.format("%Y%m%d_%H%M%S"))
}

/// Trial recorder backed by one SQLite file per run.
#[derive(Debug)]
pub struct SqliteRecorder {
    path: PathBuf,
    mode: ConnectionMode,
    busy_timeout: Duration,
    conn: Option<Connection>,
    args: Vec<String>,
}

impl SqliteRecorder {
    /// Creates a fresh timestamped database under `config.directory`.
    ///
    /// `args` are the full process arguments; the first names the database and
    /// the rest are stored as run metadata.
    pub fn create(config: &RecorderConfig, args: &[String]) -> Result<Self, GlitchError> {
        fs::create_dir_all(&config.directory).map_err(|err| {
            GlitchError::Recorder(
                ErrorInfo::new("glitch_db.directory", "failed to create database directory")
                    .with_path(&config.directory)
                    .with_hint(err.to_string()),
            )
        })?;
        let program = args.first().map(String::as_str).unwrap_or("glitch");
        let path = config
            .directory
            .join(database_file_name(program, Local::now()));
        Self::open(path, config, args)
    }

    /// Opens (or creates) the database at `path`.
    pub fn open(
        path: impl Into<PathBuf>,
        config: &RecorderConfig,
        args: &[String],
    ) -> Result<Self, GlitchError> {
        let path = path.into();
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let conn = connect(&path, busy_timeout)?;
        init_schema(&conn)?;
        let conn = match config.mode {
            ConnectionMode::Persistent => Some(conn),
            ConnectionMode::PerInsert => {
                conn.close()
                    .map_err(|(_, err)| db_error("glitch_db.close", err))?;
                None
            }
        };
        info!(path = %path.display(), mode = ?config.mode, "trial database ready");
        Ok(Self {
            path,
            mode: config.mode,
            busy_timeout,
            conn,
            args: args.to_vec(),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection handling in use.
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    fn write(conn: &mut Connection, record: &TrialRecord, args: &[String]) -> Result<(), GlitchError> {
        let tx = conn
            .transaction()
            .map_err(|err| db_error("glitch_db.transaction", err))?;
        if record.starts_run() {
            insert_metadata(&tx, &RunMetadata::from_args(args))?;
        }
        insert_trial(&tx, record)?;
        tx.commit().map_err(|err| db_error("glitch_db.commit", err))
    }
}

impl TrialRecorder for SqliteRecorder {
    fn insert(&mut self, record: &TrialRecord) -> Result<(), GlitchError> {
        match self.mode {
            ConnectionMode::Persistent => {
                let conn = self.conn.as_mut().ok_or_else(|| {
                    GlitchError::Recorder(
                        ErrorInfo::new("glitch_db.closed", "recorder already closed")
                            .with_path(&self.path),
                    )
                })?;
                Self::write(conn, record, &self.args)?;
            }
            ConnectionMode::PerInsert => {
                let mut conn = connect(&self.path, self.busy_timeout)?;
                Self::write(&mut conn, record, &self.args)?;
                conn.close()
                    .map_err(|(_, err)| db_error("glitch_db.close", err))?;
            }
        }
        debug!(trial_id = record.trial_id, outcome = %record.outcome, "trial stored");
        Ok(())
    }

    fn close(&mut self) -> Result<(), GlitchError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, err)| db_error("glitch_db.close", err))?;
        }
        Ok(())
    }
}

fn connect(path: &Path, busy_timeout: Duration) -> Result<Connection, GlitchError> {
    let conn = Connection::open(path).map_err(|err| {
        GlitchError::Recorder(
            ErrorInfo::new("glitch_db.open", "failed to open trial database")
                .with_path(path)
                .with_hint(err.to_string()),
        )
    })?;
    conn.busy_timeout(busy_timeout)
        .map_err(|err| db_error("glitch_db.busy_timeout", err))?;
    Ok(conn)
}
