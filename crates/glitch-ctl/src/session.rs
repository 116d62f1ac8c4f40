//! One experiment run: exclusively owns the hardware handles and the recorder.

use std::time::Duration;

use glitch_core::{
    epoch_seconds, throughput, Classifier, ContextKey, CycleCounts, ErrorInfo, GlitchError,
    GlitchGenerator, OutcomeTally, RawResponse, ResetLine, TargetChannel, TrialParameters, TrialRecord,
    TrialRecorder,
};
use tracing::{info, warn};

use crate::arming::GlitchArming;
use crate::config::SessionConfig;
use crate::resync::{drain_input, ResyncProtocol, ResyncReport, ResyncStatus};

/// Drives trials strictly one at a time.
#[derive(Debug)]
pub struct GlitchSession<G, C, R, Rec> {
    arming: GlitchArming<G>,
    channel: C,
    reset_line: R,
    recorder: Rec,
    resync: ResyncProtocol,
    classifier: Classifier,
    token: Option<Vec<u8>>,
    response_len: usize,
    input_drain_timeout: Duration,
    tally: OutcomeTally,
    started_at: i64,
}

impl<G, C, R, Rec> GlitchSession<G, C, R, Rec>
where
    G: GlitchGenerator,
    C: TargetChannel,
    R: ResetLine,
    Rec: TrialRecorder,
{
    /// Opens a session. The generator clock must match the configured clock.
    pub fn new(
        config: &SessionConfig,
        generator: G,
        mut channel: C,
        reset_line: R,
        recorder: Rec,
    ) -> Result<Self, GlitchError> {
        config.validate()?;
        if generator.clock_hz() != config.generator.clock_hz {
            return Err(GlitchError::Config(
                ErrorInfo::new("session.clock_mismatch", "generator clock differs from config")
                    .with_context(ContextKey::ConfiguredHz, config.generator.clock_hz)
                    .with_context(ContextKey::GeneratorHz, generator.clock_hz()),
            ));
        }
        channel.set_timeout(config.serial.timeout())?;
        let arming = GlitchArming::new(generator)?;
        info!(
            clock_hz = config.generator.clock_hz,
            port = %config.serial.port,
            token = ?config.resync.token,
            "glitch session opened"
        );
        Ok(Self {
            arming,
            channel,
            reset_line,
            recorder,
            resync: ResyncProtocol::from_config(&config.resync),
            classifier: Classifier::new(&config.classifier),
            token: config.resync.token.as_ref().map(|token| token.as_bytes().to_vec()),
            response_len: config.response_len,
            input_drain_timeout: Duration::from_millis(config.resync.input_drain_timeout_ms),
            tally: OutcomeTally::new(),
            started_at: epoch_seconds(),
        })
    }

    /// Resets the target and waits for the configured token.
    ///
    /// Without a token this falls back to reset-and-drain and reports `Ready`.
    pub fn resync(&mut self) -> Result<ResyncReport, GlitchError> {
        match &self.token {
            Some(token) => self
                .resync
                .resync(&mut self.channel, &mut self.reset_line, token),
            None => {
                let received = self
                    .resync
                    .reset_and_drain(&mut self.channel, &mut self.reset_line)?;
                Ok(ResyncReport {
                    status: ResyncStatus::Ready,
                    reads: 1,
                    received,
                })
            }
        }
    }

    /// Resets the target and throws its boot output away.
    pub fn reset_and_drain(&mut self) -> Result<RawResponse, GlitchError> {
        self.resync
            .reset_and_drain(&mut self.channel, &mut self.reset_line)
    }

    /// Pulses reset without reading anything.
    pub fn reset(&mut self) -> Result<(), GlitchError> {
        self.resync.reset(&mut self.reset_line)
    }

    /// Resets the target over the serial adapter's DTR line and returns its boot output.
    pub fn serial_reset(&mut self) -> Result<RawResponse, GlitchError> {
        self.resync.serial_reset(&mut self.channel)
    }

    /// Flushes stale input with a short read.
    pub fn drain_input(&mut self) -> Result<RawResponse, GlitchError> {
        drain_input(&mut self.channel, self.input_drain_timeout)
    }

    /// Arms the generator for `params`.
    pub fn arm(&mut self, params: TrialParameters) -> Result<CycleCounts, GlitchError> {
        self.arming.arm(params)
    }

    /// Triggers acquisition.
    pub fn capture(&mut self) -> Result<(), GlitchError> {
        self.arming.capture()
    }

    /// Re-enables glitch output.
    pub fn enable(&mut self) -> Result<(), GlitchError> {
        self.arming.enable()
    }

    /// Suppresses glitch output, e.g. while the target is reflashed.
    pub fn disable(&mut self) -> Result<(), GlitchError> {
        self.arming.disable()
    }

    /// Runs resync, arm, stimulus, capture, read, classify and record for one trial.
    pub fn run_trial(
        &mut self,
        trial_id: u64,
        params: TrialParameters,
        stimulus: &[u8],
        expected: &[u8],
    ) -> Result<TrialRecord, GlitchError> {
        let sync = self.resync()?;
        if !sync.is_ready() {
            warn!(trial_id, reads = sync.reads, "ready token not seen, continuing");
        }

        let counts = self.arming.arm(params)?;
        self.channel.write(stimulus)?;
        self.arming.capture()?;
        let response = RawResponse::new(self.channel.read(self.response_len)?);

        let outcome = self.classifier.classify(expected, response.as_bytes());
        let record = TrialRecord::new(trial_id, params, outcome, response)
            .with_clock_hz(self.arming.clock().freq_hz());
        self.recorder.insert(&record)?;
        self.tally.record(outcome);

        info!(
            trial_id,
            delay_ns = params.delay_ns,
            length_ns = params.length_ns,
            offset_cycles = counts.offset_cycles,
            repeat_cycles = counts.repeat_cycles,
            %outcome,
            "trial recorded"
        );
        Ok(record)
    }

    /// Outcome counts so far.
    pub fn tally(&self) -> &OutcomeTally {
        &self.tally
    }

    /// Trials per second since the session opened.
    pub fn throughput(&self) -> Option<u64> {
        throughput(self.started_at, epoch_seconds(), self.tally.total())
    }

    /// Arming protocol, for state inspection.
    pub fn arming(&self) -> &GlitchArming<G> {
        &self.arming
    }

    /// Borrow the target channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the target channel, e.g. to talk to the target between trials.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Borrow the reset line.
    pub fn reset_line(&self) -> &R {
        &self.reset_line
    }

    /// Borrow the recorder.
    pub fn recorder(&self) -> &Rec {
        &self.recorder
    }

    /// Closes the recorder and tears the session down, returning the final tally.
    pub fn close(mut self) -> Result<OutcomeTally, GlitchError> {
        self.recorder.close()?;
        info!(trials = self.tally.total(), "glitch session closed");
        Ok(self.tally)
    }
}
