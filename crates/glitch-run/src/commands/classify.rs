use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use glitch_core::{Classifier, ClassifierConfig};

use crate::paint;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Response the unglitched target produces.
    #[arg(long)]
    pub expected: String,
    /// Observed response text.
    #[arg(long, conflicts_with = "response_file", required_unless_present = "response_file")]
    pub response: Option<String>,
    /// File holding the raw observed response bytes.
    #[arg(long)]
    pub response_file: Option<PathBuf>,
    /// Substring marking a normal reset.
    #[arg(long, default_value = "Falling")]
    pub reset_marker: String,
    /// Substring marking a fatal exception.
    #[arg(long, default_value = "Fatal exception")]
    pub crash_marker: String,
}

pub fn run(args: &ClassifyArgs) -> Result<(), Box<dyn Error>> {
    let response = match (&args.response, &args.response_file) {
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, Some(path)) => fs::read(path)?,
        (None, None) => return Err("either --response or --response-file is required".into()),
    };
    let classifier = Classifier::new(&ClassifierConfig {
        reset_marker: args.reset_marker.clone(),
        crash_marker: args.crash_marker.clone(),
    });
    let outcome = classifier.classify(args.expected.as_bytes(), &response);
    let line = format!("{} ({})", outcome, outcome.code());
    println!("{}", paint::outcome(outcome, &line));
    Ok(())
}
