//! Nanosecond to generator clock cycle translation.

use serde::{Deserialize, Serialize};

use crate::errors::{ContextKey, ErrorInfo, GlitchError};
use crate::types::{CycleCounts, TrialParameters};

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Validated generator frequency used to convert durations into cycle counts.
///
/// Both divisions floor, so a programmed duration can be up to
/// `ns_per_cycle - 1` nanoseconds shorter than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ClockTranslator {
    freq_hz: u64,
    ns_per_cycle: u64,
}

impl ClockTranslator {
    /// Creates a translator for the given generator frequency.
    ///
    /// Frequencies of zero or above 1 GHz leave no whole nanosecond per cycle
    /// and are rejected as configuration errors.
    pub fn new(freq_hz: u64) -> Result<Self, GlitchError> {
        if freq_hz == 0 {
            return Err(GlitchError::Config(
                ErrorInfo::new("clock.zero_frequency", "generator frequency must be positive")
                    .with_context(ContextKey::FrequencyHz, freq_hz),
            ));
        }
        let ns_per_cycle = NANOS_PER_SECOND / freq_hz;
        if ns_per_cycle == 0 {
            return Err(GlitchError::Config(
                ErrorInfo::new(
                    "clock.frequency_too_high",
                    "generator frequency exceeds one cycle per nanosecond",
                )
                .with_context(ContextKey::FrequencyHz, freq_hz)
                .with_hint("use a frequency of at most 1000000000 Hz"),
            ));
        }
        Ok(Self {
            freq_hz,
            ns_per_cycle,
        })
    }

    /// Generator frequency in hertz.
    pub fn freq_hz(&self) -> u64 {
        self.freq_hz
    }

    /// Whole nanoseconds per generator cycle.
    pub fn ns_per_cycle(&self) -> u64 {
        self.ns_per_cycle
    }

    /// Converts a duration into a cycle count.
    pub fn to_cycles(&self, duration_ns: u64) -> u64 {
        duration_ns / self.ns_per_cycle
    }

    /// Converts both trial durations at once.
    pub fn to_counts(&self, params: &TrialParameters) -> CycleCounts {
        CycleCounts {
            offset_cycles: self.to_cycles(params.delay_ns),
            repeat_cycles: self.to_cycles(params.length_ns),
        }
    }

    /// Duration actually realised by `cycles` generator cycles.
    pub fn programmed_ns(&self, cycles: u64) -> u64 {
        cycles.saturating_mul(self.ns_per_cycle)
    }

    /// Nanoseconds lost to flooring when programming `duration_ns`.
    pub fn quantization_error_ns(&self, duration_ns: u64) -> u64 {
        duration_ns % self.ns_per_cycle
    }
}

impl TryFrom<u64> for ClockTranslator {
    type Error = GlitchError;

    fn try_from(freq_hz: u64) -> Result<Self, Self::Error> {
        Self::new(freq_hz)
    }
}

impl From<ClockTranslator> for u64 {
    fn from(clock: ClockTranslator) -> Self {
        clock.freq_hz
    }
}

/// One-shot conversion of `duration_ns` at `freq_hz`.
pub fn to_cycles(duration_ns: u64, freq_hz: u64) -> Result<u64, GlitchError> {
    Ok(ClockTranslator::new(freq_hz)?.to_cycles(duration_ns))
}
