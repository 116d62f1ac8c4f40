//! Table layout of a run database and the row-level readers and writers.

use glitch_core::{
    ContextKey, ErrorInfo, GlitchError, Outcome, RawResponse, RunMetadata, TrialRecord,
};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// Creates the `experiments` and `metadata` tables when they are missing.
pub fn init_schema(conn: &Connection) -> Result<(), GlitchError> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS experiments(
            id INTEGER,
            delay INTEGER,
            length INTEGER,
            color TEXT,
            response BLOB,
            clock INTEGER
        );
        CREATE TABLE IF NOT EXISTS metadata(
            stime_seconds INTEGER,
            argv BLOB
        );
        COMMIT;",
    )
    .map_err(|err| db_error("glitch_db.schema", err))
}

/// Appends one metadata row.
pub fn insert_metadata(conn: &Connection, metadata: &RunMetadata) -> Result<(), GlitchError> {
    conn.execute(
        "INSERT INTO metadata (stime_seconds, argv) VALUES (?1, ?2)",
        params![metadata.start_time, metadata.invocation_arguments],
    )
    .map_err(|err| db_error("glitch_db.insert_metadata", err))?;
    Ok(())
}

/// Appends one trial row. Integers above `i64::MAX` are rejected.
pub fn insert_trial(conn: &Connection, record: &TrialRecord) -> Result<(), GlitchError> {
    let clock = record.clock_hz.map(|hz| to_sql_int("clock", hz)).transpose()?;
    conn.execute(
        "INSERT INTO experiments (id, delay, length, color, response, clock) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            to_sql_int("id", record.trial_id)?,
            to_sql_int("delay", record.delay_ns)?,
            to_sql_int("length", record.length_ns)?,
            record.outcome.code(),
            record.raw_response.as_bytes(),
            clock,
        ],
    )
    .map_err(|err| {
        GlitchError::Recorder(
            ErrorInfo::new("glitch_db.insert_trial", err.to_string())
                .with_trial(record.trial_id),
        )
    })?;
    Ok(())
}

/// Filters applied when reading trials back.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialQuery {
    /// Only trials with this outcome.
    #[serde(default)]
    pub outcome: Option<Outcome>,
    /// At most this many trials, after filtering.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Every trial in insertion order.
pub fn load_trials(conn: &Connection) -> Result<Vec<TrialRecord>, GlitchError> {
    query_trials(conn, &TrialQuery::default())
}

/// Trials matching `query`, in insertion order.
pub fn query_trials(conn: &Connection, query: &TrialQuery) -> Result<Vec<TrialRecord>, GlitchError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, delay, length, color, response, clock FROM experiments ORDER BY rowid",
        )
        .map_err(|err| db_error("glitch_db.query", err))?;
    let rows = stmt
        .query_map([], read_row)
        .map_err(|err| db_error("glitch_db.query", err))?;
    let mut trials = Vec::new();
    for row in rows {
        if query.limit.is_some_and(|limit| trials.len() >= limit) {
            break;
        }
        let (id, delay, length, color, response, clock) =
            row.map_err(|err| db_error("glitch_db.query", err))?;
        let outcome = Outcome::from_code(&color)?;
        if query.outcome.is_some_and(|wanted| wanted != outcome) {
            continue;
        }
        trials.push(TrialRecord {
            trial_id: from_sql_int("id", id)?,
            delay_ns: from_sql_int("delay", delay)?,
            length_ns: from_sql_int("length", length)?,
            outcome,
            raw_response: RawResponse::new(response),
            clock_hz: clock.map(|hz| from_sql_int("clock", hz)).transpose()?,
        });
    }
    Ok(trials)
}

/// Every metadata row in insertion order.
pub fn load_metadata(conn: &Connection) -> Result<Vec<RunMetadata>, GlitchError> {
    let mut stmt = conn
        .prepare("SELECT stime_seconds, argv FROM metadata ORDER BY rowid")
        .map_err(|err| db_error("glitch_db.query", err))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RunMetadata {
                start_time: row.get(0)?,
                invocation_arguments: row.get(1)?,
            })
        })
        .map_err(|err| db_error("glitch_db.query", err))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| db_error("glitch_db.query", err))
}

type TrialRow = (i64, i64, i64, String, Vec<u8>, Option<i64>);

fn read_row(row: &Row<'_>) -> rusqlite::Result<TrialRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn to_sql_int(column: &str, value: u64) -> Result<i64, GlitchError> {
    i64::try_from(value).map_err(|_| {
        GlitchError::Recorder(
            ErrorInfo::new("glitch_db.out_of_range", "value does not fit an sqlite integer")
                .with_context(ContextKey::Column, column)
                .with_context(ContextKey::Value, value),
        )
    })
}

fn from_sql_int(column: &str, value: i64) -> Result<u64, GlitchError> {
    u64::try_from(value).map_err(|_| {
        GlitchError::Serde(
            ErrorInfo::new("glitch_db.negative", "stored value is negative")
                .with_context(ContextKey::Column, column)
                .with_context(ContextKey::Value, value),
        )
    })
}

pub(crate) fn db_error(code: &str, err: impl ToString) -> GlitchError {
    GlitchError::Recorder(ErrorInfo::new(code, err.to_string()))
}
