#![deny(missing_docs)]
#![doc = "Core data model, clock translation, outcome classification and collaborator traits for glitch experiments."]

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod classify;
pub mod clock;
pub mod errors;
pub mod tally;
mod types;

pub use classify::{classify, ClassificationRule, Classifier, ClassifierConfig, Matcher, Outcome};
pub use clock::{to_cycles, ClockTranslator};
pub use errors::{ContextKey, ErrorInfo, GlitchError};
pub use tally::{throughput, OutcomeTally};
pub use types::{
    contains_subslice, epoch_seconds, CycleCounts, RawResponse, RunMetadata, TrialParameters,
    TrialRecord,
};

/// Logic level of a two-state digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Driven low.
    Low,
    /// Driven high.
    High,
}

/// Handle to the fault-injection hardware.
pub trait GlitchGenerator {
    /// Frequency of the clock the offset and repeat counts are expressed in.
    fn clock_hz(&self) -> u64;

    /// Programs the number of cycles between trigger and glitch.
    fn set_offset_cycles(&mut self, cycles: u64) -> Result<(), GlitchError>;

    /// Programs the number of cycles the glitch is held.
    fn set_repeat_cycles(&mut self, cycles: u64) -> Result<(), GlitchError>;

    /// Arms the generator so the next trigger fires the glitch.
    fn arm(&mut self) -> Result<(), GlitchError>;

    /// Triggers acquisition. The hardware returns to idle on its own afterwards.
    fn capture(&mut self) -> Result<(), GlitchError>;

    /// Enables or suppresses glitch output.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), GlitchError>;

    /// Whether glitch output is currently enabled.
    fn is_enabled(&self) -> bool;
}

/// Serial link to the target.
///
/// Reads never block past [`TargetChannel::timeout`] and return whatever arrived,
/// possibly nothing.
pub trait TargetChannel {
    /// Sends `bytes` to the target.
    fn write(&mut self, bytes: &[u8]) -> Result<(), GlitchError>;

    /// Reads at most `max_len` bytes.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, GlitchError>;

    /// Current read timeout.
    fn timeout(&self) -> Duration;

    /// Replaces the read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), GlitchError>;

    /// Discards any unread input.
    fn reset_input_buffer(&mut self) -> Result<(), GlitchError>;

    /// Drives the DTR modem line. Boards with an auto-reset circuit hold the
    /// target in reset while DTR is asserted.
    fn set_dtr(&mut self, asserted: bool) -> Result<(), GlitchError>;
}

/// Digital output wired to the target's reset pin.
pub trait ResetLine {
    /// Drives the line to `level`.
    fn set_level(&mut self, level: Level) -> Result<(), GlitchError>;
}

/// Durable append-only store of trials.
pub trait TrialRecorder {
    /// Persists `record`. Trial 0 also persists run metadata, every time it is inserted.
    fn insert(&mut self, record: &TrialRecord) -> Result<(), GlitchError>;

    /// Flushes and releases the store.
    fn close(&mut self) -> Result<(), GlitchError> {
        Ok(())
    }
}

impl<T: TrialRecorder + ?Sized> TrialRecorder for Box<T> {
    fn insert(&mut self, record: &TrialRecord) -> Result<(), GlitchError> {
        (**self).insert(record)
    }

    fn close(&mut self) -> Result<(), GlitchError> {
        (**self).close()
    }
}
