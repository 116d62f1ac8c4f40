//! Priority-ordered classification of target responses.
//!
//! Rules are evaluated top to bottom and the first match wins, so a response
//! carrying both the reset and the crash marker is a [`Outcome::NormalReset`].

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ContextKey, ErrorInfo, GlitchError};
use crate::types::contains_subslice;

/// Marker the target prints when it falls back into its reset path.
pub const DEFAULT_RESET_MARKER: &[u8] = b"Falling";
/// Marker the target prints on an unrecoverable runtime exception.
pub const DEFAULT_CRASH_MARKER: &[u8] = b"Fatal exception";

/// Category assigned to each trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Response matched the expected bytes exactly.
    Success,
    /// Target went through its normal reset path.
    NormalReset,
    /// Target hit a fatal exception.
    Crash,
    /// Execution changed in a way no known signature explains.
    Anomaly,
}

impl Outcome {
    /// All outcomes in rule priority order.
    pub const ALL: [Outcome; 4] = [
        Outcome::Success,
        Outcome::NormalReset,
        Outcome::Crash,
        Outcome::Anomaly,
    ];

    /// One-letter code stored in the `color` column of result databases.
    pub fn code(self) -> &'static str {
        match self {
            Outcome::Success => "G",
            Outcome::NormalReset => "R",
            Outcome::Crash => "M",
            Outcome::Anomaly => "Y",
        }
    }

    /// Decodes a stored one-letter code.
    pub fn from_code(code: &str) -> Result<Self, GlitchError> {
        match code {
            "G" => Ok(Outcome::Success),
            "R" => Ok(Outcome::NormalReset),
            "M" => Ok(Outcome::Crash),
            "Y" => Ok(Outcome::Anomaly),
            other => Err(GlitchError::Serde(
                ErrorInfo::new("outcome.unknown_code", "unknown outcome code")
                    .with_context(ContextKey::OutcomeCode, other),
            )),
        }
    }

    /// Terminal colour conventionally used when printing this outcome.
    pub fn color_name(self) -> &'static str {
        match self {
            Outcome::Success => "green",
            Outcome::NormalReset => "red",
            Outcome::Crash => "magenta",
            Outcome::Anomaly => "yellow",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Success => "success",
            Outcome::NormalReset => "normal_reset",
            Outcome::Crash => "crash",
            Outcome::Anomaly => "anomaly",
        };
        f.write_str(label)
    }
}

impl FromStr for Outcome {
    type Err = GlitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "normal_reset" => Ok(Outcome::NormalReset),
            "crash" => Ok(Outcome::Crash),
            "anomaly" => Ok(Outcome::Anomaly),
            other => Outcome::from_code(other),
        }
    }
}

/// Predicate half of a classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Matcher {
    /// Response equals the expected bytes.
    ExactExpected,
    /// Response contains the given marker.
    Contains {
        /// Marker bytes.
        marker: Vec<u8>,
    },
    /// Matches anything.
    Always,
}

impl Matcher {
    fn matches(&self, expected: &[u8], response: &[u8]) -> bool {
        match self {
            Matcher::ExactExpected => response == expected,
            Matcher::Contains { marker } => contains_subslice(response, marker),
            Matcher::Always => true,
        }
    }
}

/// A `(predicate, outcome)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Predicate evaluated against the response.
    pub matcher: Matcher,
    /// Outcome assigned when the predicate holds.
    pub outcome: Outcome,
}

/// Marker strings the classifier looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Substring marking a normal reset.
    #[serde(default = "ClassifierConfig::default_reset_marker")]
    pub reset_marker: String,
    /// Substring marking a fatal exception.
    #[serde(default = "ClassifierConfig::default_crash_marker")]
    pub crash_marker: String,
}

impl ClassifierConfig {
    fn default_reset_marker() -> String {
        String::from_utf8_lossy(DEFAULT_RESET_MARKER).into_owned()
    }

    fn default_crash_marker() -> String {
        String::from_utf8_lossy(DEFAULT_CRASH_MARKER).into_owned()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            reset_marker: Self::default_reset_marker(),
            crash_marker: Self::default_crash_marker(),
        }
    }
}

/// Ordered first-match rule list. Always ends in a catch-all [`Outcome::Anomaly`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Classifier {
    /// Builds the standard rule list for the given markers.
    pub fn new(config: &ClassifierConfig) -> Self {
        Self::with_markers(config.reset_marker.as_bytes(), config.crash_marker.as_bytes())
    }

    /// Builds the standard rule list from raw marker bytes.
    pub fn with_markers(reset_marker: &[u8], crash_marker: &[u8]) -> Self {
        let rules = vec![
            ClassificationRule {
                matcher: Matcher::ExactExpected,
                outcome: Outcome::Success,
            },
            ClassificationRule {
                matcher: Matcher::Contains {
                    marker: reset_marker.to_vec(),
                },
                outcome: Outcome::NormalReset,
            },
            ClassificationRule {
                matcher: Matcher::Contains {
                    marker: crash_marker.to_vec(),
                },
                outcome: Outcome::Crash,
            },
            ClassificationRule {
                matcher: Matcher::Always,
                outcome: Outcome::Anomaly,
            },
        ];
        Self { rules }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Classifies `response` against `expected`. Total over all inputs.
    pub fn classify(&self, expected: &[u8], response: &[u8]) -> Outcome {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(expected, response))
            .map(|rule| rule.outcome)
            .unwrap_or(Outcome::Anomaly)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_markers(DEFAULT_RESET_MARKER, DEFAULT_CRASH_MARKER)
    }
}

/// Classifies with the default markers.
pub fn classify(expected: &[u8], response: &[u8]) -> Outcome {
    Classifier::default().classify(expected, response)
}
