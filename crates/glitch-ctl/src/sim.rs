//! In-process stand-ins for the hardware, used for dry runs and tests.

use std::collections::VecDeque;
use std::time::Duration;

use glitch_core::{
    ContextKey, CycleCounts, ErrorInfo, GlitchError, GlitchGenerator, Level, ResetLine,
    RunMetadata, TargetChannel, TrialRecord, TrialRecorder,
};

/// Generator that remembers everything programmed onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedGenerator {
    clock_hz: u64,
    offset_cycles: u64,
    repeat_cycles: u64,
    enabled: bool,
    armed: bool,
    arm_count: usize,
    capture_count: usize,
    history: Vec<CycleCounts>,
    unreachable: bool,
}

impl SimulatedGenerator {
    /// Generator clocked at `clock_hz`, initially disabled.
    pub fn new(clock_hz: u64) -> Self {
        Self {
            clock_hz,
            offset_cycles: 0,
            repeat_cycles: 0,
            enabled: false,
            armed: false,
            arm_count: 0,
            capture_count: 0,
            history: Vec::new(),
            unreachable: false,
        }
    }

    /// Makes every subsequent command fail as if the device were unplugged.
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    /// Last programmed counts.
    pub fn counts(&self) -> CycleCounts {
        CycleCounts {
            offset_cycles: self.offset_cycles,
            repeat_cycles: self.repeat_cycles,
        }
    }

    /// Counts in effect at every successful arm, oldest first.
    pub fn history(&self) -> &[CycleCounts] {
        &self.history
    }

    /// Number of successful arms.
    pub fn arm_count(&self) -> usize {
        self.arm_count
    }

    /// Number of captures.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// Whether the generator is waiting for a capture.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn check_reachable(&self, command: &str) -> Result<(), GlitchError> {
        if self.unreachable {
            return Err(GlitchError::Hardware(
                ErrorInfo::new("sim.unreachable", "simulated generator is unreachable")
                    .with_context(ContextKey::Command, command),
            ));
        }
        Ok(())
    }
}

impl GlitchGenerator for SimulatedGenerator {
    fn clock_hz(&self) -> u64 {
        self.clock_hz
    }

    fn set_offset_cycles(&mut self, cycles: u64) -> Result<(), GlitchError> {
        self.check_reachable("ext_offset")?;
        self.offset_cycles = cycles;
        Ok(())
    }

    fn set_repeat_cycles(&mut self, cycles: u64) -> Result<(), GlitchError> {
        self.check_reachable("repeat")?;
        self.repeat_cycles = cycles;
        Ok(())
    }

    fn arm(&mut self) -> Result<(), GlitchError> {
        self.check_reachable("arm")?;
        self.armed = true;
        self.arm_count += 1;
        self.history.push(self.counts());
        Ok(())
    }

    fn capture(&mut self) -> Result<(), GlitchError> {
        self.check_reachable("capture")?;
        self.armed = false;
        self.capture_count += 1;
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), GlitchError> {
        self.check_reachable("enabled")?;
        self.enabled = enabled;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Channel replaying queued read chunks and recording writes.
///
/// Each `read` consumes one queued chunk (truncated to `max_len`, the rest
/// stays queued); an empty queue behaves like a timeout and yields no bytes.
/// Replies queued with [`ScriptedChannel::push_reply`] only become readable
/// once the target has been written to, one reply per `write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedChannel {
    timeout: Duration,
    pending: VecDeque<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    read_calls: usize,
    read_timeouts: Vec<Duration>,
    input_resets: usize,
    dtr: Vec<bool>,
}

impl ScriptedChannel {
    /// Channel with the given default timeout and nothing queued.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: VecDeque::new(),
            replies: VecDeque::new(),
            writes: Vec::new(),
            read_calls: 0,
            read_timeouts: Vec::new(),
            input_resets: 0,
            dtr: Vec::new(),
        }
    }

    /// Queues one chunk to be returned by a future read.
    pub fn push_chunk(&mut self, chunk: impl Into<Vec<u8>>) {
        self.pending.push_back(chunk.into());
    }

    /// Queues a read that times out with no data.
    pub fn push_silence(&mut self) {
        self.pending.push_back(Vec::new());
    }

    /// Queues what the target answers to the next `write`.
    pub fn push_reply(&mut self, reply: impl Into<Vec<u8>>) {
        self.replies.push_back(reply.into());
    }

    /// Drops queued input and any replies not yet released.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.replies.clear();
    }

    /// Everything written, one entry per `write`.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Number of `read` calls made.
    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    /// Timeout in effect at each read.
    pub fn read_timeouts(&self) -> &[Duration] {
        &self.read_timeouts
    }

    /// Number of `reset_input_buffer` calls.
    pub fn input_resets(&self) -> usize {
        self.input_resets
    }

    /// DTR levels driven, oldest first.
    pub fn dtr_transitions(&self) -> &[bool] {
        &self.dtr
    }

    /// Chunks not yet read.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Replies still waiting for a write.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
}

impl TargetChannel for ScriptedChannel {
    fn write(&mut self, bytes: &[u8]) -> Result<(), GlitchError> {
        self.writes.push(bytes.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.pending.push_back(reply);
        }
        Ok(())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, GlitchError> {
        self.read_calls += 1;
        self.read_timeouts.push(self.timeout);
        let Some(mut chunk) = self.pending.pop_front() else {
            return Ok(Vec::new());
        };
        if chunk.len() > max_len {
            let rest = chunk.split_off(max_len);
            self.pending.push_front(rest);
        }
        Ok(chunk)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), GlitchError> {
        self.timeout = timeout;
        Ok(())
    }

    fn reset_input_buffer(&mut self) -> Result<(), GlitchError> {
        self.input_resets += 1;
        self.pending.clear();
        Ok(())
    }

    fn set_dtr(&mut self, asserted: bool) -> Result<(), GlitchError> {
        self.dtr.push(asserted);
        Ok(())
    }
}

/// Reset line that records every level it is driven to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulatedResetLine {
    transitions: Vec<Level>,
}

impl SimulatedResetLine {
    /// Line with no recorded transitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels driven, oldest first.
    pub fn transitions(&self) -> &[Level] {
        &self.transitions
    }

    /// Current level; the line idles high.
    pub fn level(&self) -> Level {
        self.transitions.last().copied().unwrap_or(Level::High)
    }
}

impl ResetLine for SimulatedResetLine {
    fn set_level(&mut self, level: Level) -> Result<(), GlitchError> {
        self.transitions.push(level);
        Ok(())
    }
}

/// Recorder keeping trials in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryRecorder {
    records: Vec<TrialRecord>,
    metadata: Vec<RunMetadata>,
    invocation: Vec<String>,
    closed: bool,
}

impl MemoryRecorder {
    /// Recorder capturing `args` as run metadata.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            invocation: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Recorded trials, in insertion order.
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Recorded metadata rows, one per trial-0 insert.
    pub fn metadata(&self) -> &[RunMetadata] {
        &self.metadata
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl TrialRecorder for MemoryRecorder {
    fn insert(&mut self, record: &TrialRecord) -> Result<(), GlitchError> {
        if self.closed {
            return Err(GlitchError::Recorder(
                ErrorInfo::new("memory.closed", "recorder already closed")
                    .with_trial(record.trial_id),
            ));
        }
        if record.starts_run() {
            self.metadata.push(RunMetadata::from_args(&self.invocation));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), GlitchError> {
        self.closed = true;
        Ok(())
    }
}
