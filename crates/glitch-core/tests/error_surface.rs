use std::path::Path;

use glitch_core::errors::{ContextKey, ErrorInfo, GlitchError};
use glitch_core::ClockTranslator;

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_trial(7)
        .with_hint("check the cable")
}

#[test]
fn hardware_error_surface() {
    let err = GlitchError::Hardware(sample_info("H001", "scope not found"));
    assert_eq!(err.info().code, "H001");
    assert_eq!(err.info().context(ContextKey::TrialId), Some("7"));
    assert!(!err.is_fatal_for_run());
}

#[test]
fn config_error_is_fatal_for_run() {
    let err = GlitchError::Config(sample_info("C001", "bad port"));
    assert!(err.is_fatal_for_run());
}

#[test]
fn display_carries_context_and_hint() {
    let err = GlitchError::Channel(
        sample_info("S001", "write failed").with_context(ContextKey::Port, "/dev/ttyUSB0"),
    );
    assert_eq!(
        err.to_string(),
        "channel error: write failed [S001] port=/dev/ttyUSB0 trial_id=7 (check the cable)"
    );
}

#[test]
fn path_context_is_rendered_from_the_path() {
    let info = ErrorInfo::new("glitch_db.open", "failed to open trial database")
        .with_path(Path::new("databases/run.sqlite"));
    assert_eq!(info.context(ContextKey::Path), Some("databases/run.sqlite"));
    assert_eq!(info.context(ContextKey::Port), None);
}

#[test]
fn clock_errors_name_the_frequency() {
    let err = ClockTranslator::new(2_000_000_000).unwrap_err();
    assert_eq!(err.info().context(ContextKey::FrequencyHz), Some("2000000000"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = GlitchError::Protocol(
        ErrorInfo::new("P001", "capture while idle").with_context(ContextKey::Command, "capture"),
    );
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Protocol");
    assert_eq!(json["detail"]["context"]["command"], "capture");
    let back: GlitchError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}
