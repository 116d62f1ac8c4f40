use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::classify::Outcome;

/// Timing requested for a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialParameters {
    /// Delay between trigger and glitch, in nanoseconds.
    pub delay_ns: u64,
    /// Glitch width, in nanoseconds.
    pub length_ns: u64,
}

impl TrialParameters {
    /// Creates a parameter pair.
    pub fn new(delay_ns: u64, length_ns: u64) -> Self {
        Self {
            delay_ns,
            length_ns,
        }
    }
}

/// Cycle counts programmed onto the generator for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CycleCounts {
    /// Cycles between trigger and glitch.
    pub offset_cycles: u64,
    /// Cycles the glitch is held.
    pub repeat_cycles: u64,
}

/// Bytes captured from the target within a bounded read window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RawResponse(Vec<u8>);

impl RawResponse {
    /// Wraps captured bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the captured bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` when nothing arrived before the read timed out.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends another read chunk.
    pub fn extend_from_slice(&mut self, chunk: &[u8]) {
        self.0.extend_from_slice(chunk);
    }

    /// Returns `true` when `needle` occurs anywhere in the response.
    ///
    /// An empty needle never matches.
    pub fn contains(&self, needle: &[u8]) -> bool {
        contains_subslice(&self.0, needle)
    }

    /// Splits the response on `\n`, trimming a trailing `\r`, decoding lossily.
    pub fn lines(&self) -> Vec<String> {
        self.0
            .split(|byte| *byte == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Consumes the wrapper, returning the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for RawResponse {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for RawResponse {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for RawResponse {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Returns `true` when `needle` is a non-empty contiguous run inside `haystack`.
pub fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Immutable record of one trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Zero-based trial index. Trial 0 also triggers run metadata recording.
    pub trial_id: u64,
    /// Requested delay in nanoseconds.
    pub delay_ns: u64,
    /// Requested glitch width in nanoseconds.
    pub length_ns: u64,
    /// Classified outcome.
    pub outcome: Outcome,
    /// Bytes read back from the target.
    pub raw_response: RawResponse,
    /// Generator frequency the trial ran at, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_hz: Option<u64>,
}

impl TrialRecord {
    /// Builds a record from trial parameters and its classified response.
    pub fn new(
        trial_id: u64,
        params: TrialParameters,
        outcome: Outcome,
        raw_response: RawResponse,
    ) -> Self {
        Self {
            trial_id,
            delay_ns: params.delay_ns,
            length_ns: params.length_ns,
            outcome,
            raw_response,
            clock_hz: None,
        }
    }

    /// Attaches the generator frequency to the record.
    pub fn with_clock_hz(mut self, clock_hz: u64) -> Self {
        self.clock_hz = Some(clock_hz);
        self
    }

    /// Returns the timing parameters of the trial.
    pub fn parameters(&self) -> TrialParameters {
        TrialParameters::new(self.delay_ns, self.length_ns)
    }

    /// Whether recording this trial also writes run metadata.
    pub fn starts_run(&self) -> bool {
        self.trial_id == 0
    }
}

/// Write-once description of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run start, seconds since the Unix epoch.
    pub start_time: i64,
    /// Invocation arguments after the program name, space separated.
    pub invocation_arguments: String,
}

impl RunMetadata {
    /// Captures metadata for `args`, skipping the program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = args
            .into_iter()
            .skip(1)
            .map(|arg| arg.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            start_time: epoch_seconds(),
            invocation_arguments: joined,
        }
    }
}

/// Current wall clock time in whole seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
