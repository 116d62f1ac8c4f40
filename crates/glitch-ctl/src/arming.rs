//! Arm/capture protocol on top of a [`GlitchGenerator`].

use glitch_core::{
    ClockTranslator, CycleCounts, ErrorInfo, GlitchError, GlitchGenerator, TrialParameters,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Scheduling axis of the arming state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmState {
    /// Nothing scheduled.
    Idle,
    /// Cycle counts programmed and the generator armed.
    Armed,
}

/// Owns the generator and tracks `{Disabled, Enabled} x {Idle, Armed}`.
#[derive(Debug)]
pub struct GlitchArming<G> {
    generator: G,
    clock: ClockTranslator,
    enabled: bool,
    state: ArmState,
    last_counts: Option<CycleCounts>,
}

impl<G: GlitchGenerator> GlitchArming<G> {
    /// Takes ownership of `generator` and enables glitch output.
    pub fn new(mut generator: G) -> Result<Self, GlitchError> {
        let clock = ClockTranslator::new(generator.clock_hz())?;
        generator.set_enabled(true)?;
        Ok(Self {
            generator,
            clock,
            enabled: true,
            state: ArmState::Idle,
            last_counts: None,
        })
    }

    /// Programs offset and repeat counts for `params` and arms the generator.
    pub fn arm(&mut self, params: TrialParameters) -> Result<CycleCounts, GlitchError> {
        let counts = self.clock.to_counts(&params);
        // A failed arm leaves the hardware in an unknown state; never report Armed.
        self.state = ArmState::Idle;
        self.generator.set_offset_cycles(counts.offset_cycles)?;
        self.generator.set_repeat_cycles(counts.repeat_cycles)?;
        self.generator.arm()?;
        self.state = ArmState::Armed;
        self.last_counts = Some(counts);
        debug!(
            delay_ns = params.delay_ns,
            length_ns = params.length_ns,
            offset_cycles = counts.offset_cycles,
            repeat_cycles = counts.repeat_cycles,
            enabled = self.enabled,
            "armed glitch generator"
        );
        Ok(counts)
    }

    /// Triggers acquisition. Only valid while armed.
    pub fn capture(&mut self) -> Result<(), GlitchError> {
        if self.state != ArmState::Armed {
            return Err(GlitchError::Protocol(
                ErrorInfo::new("arming.capture_idle", "capture issued without a preceding arm")
                    .with_hint("call arm() before capture()"),
            ));
        }
        // The driver drops back to idle on its own once the capture is issued.
        self.state = ArmState::Idle;
        self.generator.capture()?;
        trace!("capture issued");
        Ok(())
    }

    /// Re-enables glitch output.
    pub fn enable(&mut self) -> Result<(), GlitchError> {
        self.generator.set_enabled(true)?;
        self.enabled = true;
        debug!("glitch output enabled");
        Ok(())
    }

    /// Suppresses glitch output. Rejected between `arm()` and `capture()`.
    pub fn disable(&mut self) -> Result<(), GlitchError> {
        if self.state == ArmState::Armed {
            return Err(GlitchError::Protocol(
                ErrorInfo::new("arming.disable_armed", "cannot disable while armed")
                    .with_hint("capture() the pending trial first"),
            ));
        }
        self.generator.set_enabled(false)?;
        self.enabled = false;
        debug!("glitch output disabled");
        Ok(())
    }

    /// Current scheduling state.
    pub fn state(&self) -> ArmState {
        self.state
    }

    /// Whether glitch output is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Translator for the generator clock.
    pub fn clock(&self) -> ClockTranslator {
        self.clock
    }

    /// Counts programmed by the most recent successful arm.
    pub fn last_counts(&self) -> Option<CycleCounts> {
        self.last_counts
    }

    /// Borrow the generator.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Mutably borrow the generator.
    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    /// Releases the generator.
    pub fn into_inner(self) -> G {
        self.generator
    }
}
