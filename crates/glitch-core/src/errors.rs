//! Structured error types shared across the glitch crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a piece of error context refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKey {
    /// File or database path.
    Path,
    /// Serial device of the target.
    Port,
    /// A clock frequency in hertz.
    FrequencyHz,
    /// Frequency the session was configured for.
    ConfiguredHz,
    /// Frequency the generator reports.
    GeneratorHz,
    /// Trial the failure belongs to.
    TrialId,
    /// Generator command that failed.
    Command,
    /// Stored outcome code that failed to decode.
    OutcomeCode,
    /// Database column.
    Column,
    /// Offending value.
    Value,
}

impl ContextKey {
    /// Name used when rendering and serialising the key.
    pub fn as_str(self) -> &'static str {
        match self {
            ContextKey::Path => "path",
            ContextKey::Port => "port",
            ContextKey::FrequencyHz => "frequency_hz",
            ContextKey::ConfiguredHz => "configured_hz",
            ContextKey::GeneratorHz => "generator_hz",
            ContextKey::TrialId => "trial_id",
            ContextKey::Command => "command",
            ContextKey::OutcomeCode => "outcome_code",
            ContextKey::Column => "column",
            ContextKey::Value => "value",
        }
    }
}

/// Structured payload attached to every [`GlitchError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Context describing the hardware or data the failure concerns.
    #[serde(default)]
    pub context: BTreeMap<ContextKey, String>,
    /// Remediation hint, or the underlying driver error text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with the given code and message and no context.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Attaches `value` under `key`, replacing any earlier value.
    pub fn with_context(mut self, key: ContextKey, value: impl ToString) -> Self {
        self.context.insert(key, value.to_string());
        self
    }

    /// Attaches the path a file or database operation failed on.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context(ContextKey::Path, path.display())
    }

    /// Attaches the trial the failure belongs to.
    pub fn with_trial(self, trial_id: u64) -> Self {
        self.with_context(ContextKey::TrialId, trial_id)
    }

    /// Sets the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Context value recorded under `key`.
    pub fn context(&self, key: ContextKey) -> Option<&str> {
        self.context.get(&key).map(String::as_str)
    }
}

/// Canonical error type for the glitch engine.
///
/// Short or empty serial reads are never reported through this type; they are
/// ordinary data. Only hard failures end up here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum GlitchError {
    /// Invalid configuration (frequency, port, config file). Fatal for the run.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// The glitch generator rejected a command or is unreachable.
    #[error("hardware error: {0}")]
    Hardware(ErrorInfo),
    /// The arming protocol was driven out of order.
    #[error("protocol error: {0}")]
    Protocol(ErrorInfo),
    /// Hard failures of the serial channel to the target.
    #[error("channel error: {0}")]
    Channel(ErrorInfo),
    /// Trial storage failures.
    #[error("recorder error: {0}")]
    Recorder(ErrorInfo),
    /// Serialization and decoding errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.code)?;
        for (key, value) in &self.context {
            write!(f, " {}={value}", key.as_str())?;
        }
        match &self.hint {
            Some(hint) => write!(f, " ({hint})"),
            None => Ok(()),
        }
    }
}

impl GlitchError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            GlitchError::Config(info)
            | GlitchError::Hardware(info)
            | GlitchError::Protocol(info)
            | GlitchError::Channel(info)
            | GlitchError::Recorder(info)
            | GlitchError::Serde(info) => info,
        }
    }

    /// Returns `true` when the error must stop the whole run. Hardware errors
    /// only cost the current trial; the driver decides whether to skip it.
    pub fn is_fatal_for_run(&self) -> bool {
        !matches!(self, GlitchError::Hardware(_))
    }
}
