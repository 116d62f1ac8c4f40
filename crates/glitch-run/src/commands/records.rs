use std::error::Error;
use std::io::stdout;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use glitch_db::{export_csv, export_json, write_csv, RunDump};
use rusqlite::{Connection, OpenFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// Run database produced by `glitch-run dry-run` or a rig driver.
    #[arg(long)]
    pub db: PathBuf,
    /// Output encoding.
    #[arg(long, value_enum, default_value_t = RecordFormat::Json)]
    pub format: RecordFormat,
    /// Write to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &RecordsArgs) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open_with_flags(&args.db, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    match (&args.out, args.format) {
        (Some(out), RecordFormat::Json) => export_json(&conn, out)?,
        (Some(out), RecordFormat::Csv) => export_csv(&conn, out)?,
        (None, RecordFormat::Json) => {
            let dump = RunDump::load(&conn)?;
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
        (None, RecordFormat::Csv) => {
            let mut wtr = csv::Writer::from_writer(stdout());
            write_csv(&conn, &mut wtr)?;
            wtr.flush()?;
        }
    }
    Ok(())
}
