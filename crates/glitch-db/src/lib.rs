#![deny(missing_docs)]
//! SQLite trial recorder for glitch experiments.

pub mod export;
pub mod recorder;
pub mod schema;

pub use export::{export_csv, export_json, write_csv, RunDump};
pub use recorder::{database_file_name, ConnectionMode, RecorderConfig, SqliteRecorder};
pub use schema::{
    init_schema, insert_metadata, insert_trial, load_metadata, load_trials, query_trials,
    TrialQuery,
};
