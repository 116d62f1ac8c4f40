use std::io::Write;

use glitch_ctl::SessionConfig;
use tempfile::NamedTempFile;

#[test]
fn defaults_match_the_husky_setup() {
    let config = SessionConfig::from_yaml("{}").expect("config");
    assert_eq!(config.generator.clock_hz, 200_000_000);
    assert_eq!(config.serial.port, "/dev/ttyUSB0");
    assert_eq!(config.serial.baud_rate, 115_200);
    assert_eq!(config.serial.timeout_ms, 100);
    assert_eq!(config.resync.reset_time_ms, 200);
    assert_eq!(config.resync.drain_timeout_ms, 300);
    assert_eq!(config.resync.dtr_pulse_ms, 100);
    assert_eq!(config.resync.token, None);
    assert_eq!(config.classifier.reset_marker, "Falling");
    assert_eq!(config.classifier.crash_marker, "Fatal exception");
    assert_eq!(config.response_len, 4096);
}

#[test]
fn load_reads_yaml_from_disk() {
    let mut file = NamedTempFile::new().expect("temp");
    writeln!(
        file,
        "generator:\n  clock_hz: 100000000\nserial:\n  port: /dev/ttyACM0\nresync:\n  token: \"Ready\"\n  debug_echo: true"
    )
    .expect("write");
    let config = SessionConfig::load(file.path()).expect("load");
    assert_eq!(config.generator.translator().unwrap().ns_per_cycle(), 10);
    assert_eq!(config.serial.port, "/dev/ttyACM0");
    assert_eq!(config.resync.token.as_deref(), Some("Ready"));
    assert!(config.resync.debug_echo);
}

#[test]
fn zero_clock_is_rejected() {
    let err = SessionConfig::from_yaml("generator:\n  clock_hz: 0\n").unwrap_err();
    assert_eq!(err.info().code, "clock.zero_frequency");
}

#[test]
fn empty_port_is_rejected() {
    let err = SessionConfig::from_yaml("serial:\n  port: \"\"\n").unwrap_err();
    assert_eq!(err.info().code, "config.serial_port");
}

#[test]
fn malformed_yaml_is_a_config_error() {
    let err = SessionConfig::from_yaml("generator: [").unwrap_err();
    assert_eq!(err.info().code, "config.parse");
}

#[test]
fn missing_file_is_a_config_error() {
    let err = SessionConfig::load(std::path::Path::new("/nonexistent/run.yaml")).unwrap_err();
    assert_eq!(err.info().code, "config.read");
}
