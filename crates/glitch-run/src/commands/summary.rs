use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use glitch_db::RunDump;
use rusqlite::{Connection, OpenFlags};

use crate::paint;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Run database to summarise.
    #[arg(long)]
    pub db: PathBuf,
}

pub fn run(args: &SummaryArgs) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open_with_flags(&args.db, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let dump = RunDump::load(&conn)?;
    for meta in &dump.metadata {
        println!("run started {} with: {}", meta.start_time, meta.invocation_arguments);
    }
    println!("trials: {}", dump.tally.total());
    for (outcome, count) in dump.tally.iter() {
        let label = format!("{:<13}", outcome.to_string());
        println!("  {} {:>3} {}", paint::outcome(outcome, &label), outcome.code(), count);
    }
    Ok(())
}
