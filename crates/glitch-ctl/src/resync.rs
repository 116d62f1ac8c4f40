//! Target reset and resynchronisation over the serial channel.

use std::thread;
use std::time::Duration;

use glitch_core::{contains_subslice, GlitchError, Level, RawResponse, ResetLine, TargetChannel};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ResyncConfig;

/// Upper bound on channel reads while waiting for the ready token.
pub const MAX_RESYNC_READS: usize = 5;
/// Bytes requested per resync read.
pub const RESYNC_CHUNK_LEN: usize = 4096;
/// Bytes requested when flushing stale input.
pub const DRAIN_CHUNK_LEN: usize = 8192;
/// Default reset hold time.
pub const DEFAULT_RESET_TIME: Duration = Duration::from_millis(200);
/// Default read timeout for reset-and-drain.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(300);
/// Default read timeout for [`drain_input`].
pub const DEFAULT_INPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
/// Default DTR pulse width for [`ResyncProtocol::serial_reset`].
pub const DEFAULT_DTR_PULSE: Duration = Duration::from_millis(100);

/// Whether the ready token was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncStatus {
    /// Token found in the accumulated output.
    Ready,
    /// Read budget exhausted without the token. Not an error.
    TokenNotFound,
}

/// Outcome of a resync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncReport {
    /// Token status.
    pub status: ResyncStatus,
    /// Number of channel reads performed.
    pub reads: usize,
    /// Everything received after releasing reset.
    pub received: RawResponse,
}

impl ResyncReport {
    /// `true` when the token was seen.
    pub fn is_ready(&self) -> bool {
        self.status == ResyncStatus::Ready
    }
}

/// Drives the reset line and waits for the target to come back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncProtocol {
    reset_time: Duration,
    drain_timeout: Duration,
    dtr_pulse: Duration,
    debug_echo: bool,
}

impl Default for ResyncProtocol {
    fn default() -> Self {
        Self {
            reset_time: DEFAULT_RESET_TIME,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            dtr_pulse: DEFAULT_DTR_PULSE,
            debug_echo: false,
        }
    }
}

impl ResyncProtocol {
    /// Protocol holding reset for `reset_time`.
    pub fn new(reset_time: Duration) -> Self {
        Self {
            reset_time,
            ..Self::default()
        }
    }

    /// Protocol configured from YAML settings.
    pub fn from_config(config: &ResyncConfig) -> Self {
        Self {
            reset_time: Duration::from_millis(config.reset_time_ms),
            drain_timeout: Duration::from_millis(config.drain_timeout_ms),
            dtr_pulse: Duration::from_millis(config.dtr_pulse_ms),
            debug_echo: config.debug_echo,
        }
    }

    /// Overrides the read timeout used by [`ResyncProtocol::reset_and_drain`].
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Overrides the DTR pulse width used by [`ResyncProtocol::serial_reset`].
    pub fn with_dtr_pulse(mut self, pulse: Duration) -> Self {
        self.dtr_pulse = pulse;
        self
    }

    /// Enables line-by-line debug echo of received output.
    pub fn with_debug_echo(mut self, echo: bool) -> Self {
        self.debug_echo = echo;
        self
    }

    /// Reset hold time.
    pub fn reset_time(&self) -> Duration {
        self.reset_time
    }

    /// Asserts reset, holds it, and releases it.
    pub fn reset<R: ResetLine + ?Sized>(&self, line: &mut R) -> Result<(), GlitchError> {
        line.set_level(Level::Low)?;
        if !self.reset_time.is_zero() {
            thread::sleep(self.reset_time);
        }
        line.set_level(Level::High)?;
        trace!(hold_ms = self.reset_time.as_millis() as u64, "target reset pulsed");
        Ok(())
    }

    /// Resets the target and reads until `token` shows up or
    /// [`MAX_RESYNC_READS`] reads have been made.
    ///
    /// An empty token is trivially present, so a single read is made.
    pub fn resync<C, R>(
        &self,
        channel: &mut C,
        line: &mut R,
        token: &[u8],
    ) -> Result<ResyncReport, GlitchError>
    where
        C: TargetChannel + ?Sized,
        R: ResetLine + ?Sized,
    {
        self.reset(line)?;

        let mut received = RawResponse::default();
        let mut reads = 0;
        let mut found = false;
        while reads < MAX_RESYNC_READS {
            let chunk = channel.read(RESYNC_CHUNK_LEN)?;
            reads += 1;
            received.extend_from_slice(&chunk);
            if token.is_empty() || contains_subslice(received.as_bytes(), token) {
                found = true;
                break;
            }
        }

        if self.debug_echo {
            echo_lines(&received);
        }
        let status = if found {
            ResyncStatus::Ready
        } else {
            ResyncStatus::TokenNotFound
        };
        debug!(?status, reads, bytes = received.as_bytes().len(), "resync finished");
        Ok(ResyncReport {
            status,
            reads,
            received,
        })
    }

    /// Holds reset while draining one chunk under the drain timeout, then
    /// restores the caller's timeout and releases reset.
    pub fn reset_and_drain<C, R>(
        &self,
        channel: &mut C,
        line: &mut R,
    ) -> Result<RawResponse, GlitchError>
    where
        C: TargetChannel + ?Sized,
        R: ResetLine + ?Sized,
    {
        line.set_level(Level::Low)?;
        let drained = read_with_timeout(channel, self.drain_timeout, RESYNC_CHUNK_LEN);
        let released = line.set_level(Level::High);
        let drained = drained?;
        released?;
        if self.debug_echo {
            echo_lines(&drained);
        }
        debug!(bytes = drained.as_bytes().len(), "reset and drain finished");
        Ok(drained)
    }

    /// Resets the target through the serial adapter's DTR line instead of the
    /// reset GPIO, then reads one chunk of boot output under the channel's
    /// current timeout.
    pub fn serial_reset<C: TargetChannel + ?Sized>(
        &self,
        channel: &mut C,
    ) -> Result<RawResponse, GlitchError> {
        channel.set_dtr(true)?;
        if !self.dtr_pulse.is_zero() {
            thread::sleep(self.dtr_pulse);
        }
        channel.set_dtr(false)?;
        let received = RawResponse::new(channel.read(RESYNC_CHUNK_LEN)?);
        if self.debug_echo {
            echo_lines(&received);
        }
        debug!(
            pulse_ms = self.dtr_pulse.as_millis() as u64,
            bytes = received.as_bytes().len(),
            "serial reset finished"
        );
        Ok(received)
    }
}

/// Reads and discards one large chunk under a short timeout.
pub fn drain_input<C: TargetChannel + ?Sized>(
    channel: &mut C,
    timeout: Duration,
) -> Result<RawResponse, GlitchError> {
    read_with_timeout(channel, timeout, DRAIN_CHUNK_LEN)
}

/// Drops whatever the transport has buffered.
pub fn discard_input<C: TargetChannel + ?Sized>(channel: &mut C) -> Result<(), GlitchError> {
    channel.reset_input_buffer()
}

/// Performs one read under `timeout`; the previous timeout is restored even if the read fails.
fn read_with_timeout<C: TargetChannel + ?Sized>(
    channel: &mut C,
    timeout: Duration,
    max_len: usize,
) -> Result<RawResponse, GlitchError> {
    let original = channel.timeout();
    channel.set_timeout(timeout)?;
    let read = channel.read(max_len);
    let restored = channel.set_timeout(original);
    let bytes = read?;
    restored?;
    Ok(RawResponse::new(bytes))
}

fn echo_lines(received: &RawResponse) {
    for line in received.lines() {
        debug!(target: "glitch_ctl::target", "\t{line}");
    }
}
