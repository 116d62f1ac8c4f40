use std::time::Duration;

use glitch_core::{GlitchError, Outcome, TargetChannel, TrialParameters};
use glitch_ctl::{
    GlitchSession, MemoryRecorder, ScriptedChannel, SessionConfig, SimulatedGenerator,
    SimulatedResetLine,
};

type SimSession =
    GlitchSession<SimulatedGenerator, ScriptedChannel, SimulatedResetLine, MemoryRecorder>;

const EXPECTED: &[u8] = b"OK\r\n";

fn config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.resync.token = Some("Ready".to_string());
    config.resync.reset_time_ms = 0;
    config
}

fn session_with(channel: ScriptedChannel) -> SimSession {
    GlitchSession::new(
        &config(),
        SimulatedGenerator::new(200_000_000),
        channel,
        SimulatedResetLine::new(),
        MemoryRecorder::new(["glitch-run", "dry-run"]),
    )
    .expect("session")
}

#[test]
fn trial_arms_with_expected_cycles_and_records() {
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    channel.push_chunk(b"Ready\r\n".to_vec());
    channel.push_chunk(EXPECTED.to_vec());
    let mut session = session_with(channel);

    let record = session
        .run_trial(0, TrialParameters::new(100, 50), b"go", EXPECTED)
        .expect("trial");
    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.clock_hz, Some(200_000_000));

    let generator = session.arming().generator();
    assert_eq!(generator.history().len(), 1);
    assert_eq!(generator.history()[0].offset_cycles, 20);
    assert_eq!(generator.history()[0].repeat_cycles, 10);
    assert_eq!(generator.capture_count(), 1);
    assert_eq!(session.channel().writes(), &[b"go".to_vec()]);
    assert_eq!(session.recorder().records(), &[record]);
    assert_eq!(session.recorder().metadata().len(), 1);
}

#[test]
fn missing_token_does_not_stop_the_trial() {
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    for _ in 0..5 {
        channel.push_silence();
    }
    channel.push_chunk(b"Fatal exception (0)".to_vec());
    let mut session = session_with(channel);

    let record = session
        .run_trial(1, TrialParameters::new(40, 5), b"go", EXPECTED)
        .expect("trial");
    assert_eq!(record.outcome, Outcome::Crash);
    assert_eq!(session.channel().read_calls(), 6);
    assert!(session.recorder().metadata().is_empty());
}

#[test]
fn tally_and_close_report_outcomes() {
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    channel.push_chunk(b"Ready".to_vec());
    channel.push_chunk(b"Falling back".to_vec());
    channel.push_chunk(b"Ready".to_vec());
    channel.push_silence();
    let mut session = session_with(channel);

    session
        .run_trial(0, TrialParameters::new(10, 5), b"go", EXPECTED)
        .expect("first");
    session
        .run_trial(1, TrialParameters::new(15, 5), b"go", EXPECTED)
        .expect("second");
    assert_eq!(session.tally().count(Outcome::NormalReset), 1);
    assert_eq!(session.tally().count(Outcome::Anomaly), 1);

    let tally = session.close().expect("close");
    assert_eq!(tally.total(), 2);
}

#[test]
fn unreachable_generator_fails_session_setup() {
    let mut generator = SimulatedGenerator::new(200_000_000);
    generator.set_unreachable(true);
    let err = GlitchSession::new(
        &config(),
        generator,
        ScriptedChannel::new(Duration::from_millis(100)),
        SimulatedResetLine::new(),
        MemoryRecorder::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GlitchError::Hardware(_)));
}

#[test]
fn out_of_order_capture_is_rejected_without_recording() {
    let mut session = session_with(ScriptedChannel::new(Duration::from_millis(100)));
    session.disable().expect("disable");
    session.enable().expect("enable");

    let err = session.capture().unwrap_err();
    assert!(matches!(err, GlitchError::Protocol(_)));
    assert!(session.recorder().records().is_empty());
}

#[test]
fn clock_mismatch_is_rejected() {
    let err = GlitchSession::new(
        &config(),
        SimulatedGenerator::new(100_000_000),
        ScriptedChannel::new(Duration::from_millis(100)),
        SimulatedResetLine::new(),
        MemoryRecorder::default(),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "session.clock_mismatch");
}

#[test]
fn without_token_the_session_drains_instead() {
    let mut config = config();
    config.resync.token = None;
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    channel.push_chunk(b"whatever the bootloader says".to_vec());
    channel.push_chunk(EXPECTED.to_vec());
    let mut session = GlitchSession::new(
        &config,
        SimulatedGenerator::new(200_000_000),
        channel,
        SimulatedResetLine::new(),
        MemoryRecorder::default(),
    )
    .expect("session");

    let record = session
        .run_trial(0, TrialParameters::new(100, 50), b"go", EXPECTED)
        .expect("trial");
    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(
        session.channel().read_timeouts(),
        &[Duration::from_millis(300), Duration::from_millis(100)]
    );
}

#[test]
fn reply_survives_a_resync_that_misses_the_token() {
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    channel.push_chunk(b"boot without token".to_vec());
    channel.push_reply(EXPECTED.to_vec());
    let mut session = session_with(channel);

    let record = session
        .run_trial(0, TrialParameters::new(100, 50), b"go", EXPECTED)
        .expect("trial");
    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.raw_response.as_bytes(), EXPECTED);
    assert_eq!(session.channel().read_calls(), 6);
    assert_eq!(session.channel().pending_replies(), 0);
}

#[test]
fn reply_is_only_readable_after_a_write() {
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    channel.push_reply(b"pong".to_vec());
    assert!(channel.read(16).expect("read").is_empty());

    channel.write(b"ping").expect("write");
    assert_eq!(channel.read(16).expect("read"), b"pong".to_vec());

    channel.push_reply(b"stale".to_vec());
    channel.clear();
    channel.write(b"ping").expect("write");
    assert!(channel.read(16).expect("read").is_empty());
}

#[test]
fn session_serial_reset_uses_dtr() {
    let mut config = config();
    config.resync.dtr_pulse_ms = 0;
    let mut channel = ScriptedChannel::new(Duration::from_millis(100));
    channel.push_chunk(b"Ready\r\n".to_vec());
    let mut session = GlitchSession::new(
        &config,
        SimulatedGenerator::new(200_000_000),
        channel,
        SimulatedResetLine::new(),
        MemoryRecorder::default(),
    )
    .expect("session");

    let boot = session.serial_reset().expect("serial reset");
    assert_eq!(boot.as_bytes(), b"Ready\r\n");
    assert_eq!(session.channel().dtr_transitions(), &[true, false]);
    assert!(session.reset_line().transitions().is_empty());
}
