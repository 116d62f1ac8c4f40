//! Arming, resynchronisation and per-trial session control for glitch experiments.

pub mod arming;
pub mod config;
pub mod resync;
pub mod session;
pub mod sim;

pub use arming::{ArmState, GlitchArming};
pub use config::{GeneratorConfig, ResyncConfig, SerialConfig, SessionConfig};
pub use resync::{
    discard_input, drain_input, ResyncProtocol, ResyncReport, ResyncStatus, DEFAULT_DTR_PULSE,
    MAX_RESYNC_READS, RESYNC_CHUNK_LEN,
};
pub use session::GlitchSession;
pub use sim::{MemoryRecorder, ScriptedChannel, SimulatedGenerator, SimulatedResetLine};
