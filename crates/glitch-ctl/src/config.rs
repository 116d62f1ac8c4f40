use std::fs;
use std::path::Path;
use std::time::Duration;

use glitch_core::{ClassifierConfig, ClockTranslator, ContextKey, ErrorInfo, GlitchError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a glitch session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Glitch generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Serial link to the target.
    #[serde(default)]
    pub serial: SerialConfig,
    /// Reset and resynchronisation behaviour.
    #[serde(default)]
    pub resync: ResyncConfig,
    /// Markers used to classify responses.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Maximum bytes read back after each capture.
    #[serde(default = "default_response_len")]
    pub response_len: usize,
}

fn default_response_len() -> usize {
    4096
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            serial: SerialConfig::default(),
            resync: ResyncConfig::default(),
            classifier: ClassifierConfig::default(),
            response_len: default_response_len(),
        }
    }
}

impl SessionConfig {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, GlitchError> {
        let text = fs::read_to_string(path).map_err(|err| {
            GlitchError::Config(
                ErrorInfo::new("config.read", "failed to read session config")
                    .with_path(path)
                    .with_hint(err.to_string()),
            )
        })?;
        Self::from_yaml(&text)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, GlitchError> {
        let config: SessionConfig = serde_yaml::from_str(text).map_err(|err| {
            GlitchError::Config(ErrorInfo::new("config.parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the run cannot proceed with.
    pub fn validate(&self) -> Result<(), GlitchError> {
        self.generator.translator()?;
        if self.serial.port.trim().is_empty() {
            return Err(GlitchError::Config(
                ErrorInfo::new("config.serial_port", "serial port must not be empty")
                    .with_hint("set serial.port, e.g. /dev/ttyUSB0"),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(GlitchError::Config(
                ErrorInfo::new("config.baud_rate", "baud rate must be positive")
                    .with_context(ContextKey::Port, &self.serial.port),
            ));
        }
        if self.response_len == 0 {
            return Err(GlitchError::Config(ErrorInfo::new(
                "config.response_len",
                "response_len must be positive",
            )));
        }
        Ok(())
    }
}

/// Glitch generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generator clock frequency in hertz.
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u64,
}

fn default_clock_hz() -> u64 {
    200_000_000
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            clock_hz: default_clock_hz(),
        }
    }
}

impl GeneratorConfig {
    /// Validated translator for the configured clock.
    pub fn translator(&self) -> Result<ClockTranslator, GlitchError> {
        ClockTranslator::new(self.clock_hz)
    }
}

/// Serial link settings handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path of the target's UART.
    #[serde(default = "default_port")]
    pub port: String,
    /// Line speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Default read timeout in milliseconds.
    #[serde(default = "default_serial_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_serial_timeout_ms() -> u64 {
    100
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_serial_timeout_ms(),
        }
    }
}

impl SerialConfig {
    /// Default read timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Reset and resynchronisation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncConfig {
    /// Ready token printed by the target after reset. Without one the session
    /// resets and drains instead of waiting.
    #[serde(default)]
    pub token: Option<String>,
    /// How long reset is held low, in milliseconds.
    #[serde(default = "default_reset_time_ms")]
    pub reset_time_ms: u64,
    /// Read timeout used while draining post-reset output, in milliseconds.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    /// Read timeout used when flushing stale input, in milliseconds.
    #[serde(default = "default_input_drain_timeout_ms")]
    pub input_drain_timeout_ms: u64,
    /// DTR pulse width for serial-adapter resets, in milliseconds.
    #[serde(default = "default_dtr_pulse_ms")]
    pub dtr_pulse_ms: u64,
    /// Echo every line received during resync at debug level.
    #[serde(default)]
    pub debug_echo: bool,
}

fn default_reset_time_ms() -> u64 {
    200
}

fn default_drain_timeout_ms() -> u64 {
    300
}

fn default_input_drain_timeout_ms() -> u64 {
    10
}

fn default_dtr_pulse_ms() -> u64 {
    100
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            token: None,
            reset_time_ms: default_reset_time_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            input_drain_timeout_ms: default_input_drain_timeout_ms(),
            dtr_pulse_ms: default_dtr_pulse_ms(),
            debug_echo: false,
        }
    }
}
