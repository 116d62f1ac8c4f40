use glitch_core::{
    throughput, Outcome, OutcomeTally, RawResponse, RunMetadata, TrialParameters, TrialRecord,
};

#[test]
fn tally_counts_every_outcome() {
    let tally: OutcomeTally = [
        Outcome::Success,
        Outcome::Anomaly,
        Outcome::Success,
        Outcome::Crash,
    ]
    .into_iter()
    .collect();
    assert_eq!(tally.total(), 4);
    assert_eq!(tally.count(Outcome::Success), 2);
    assert_eq!(tally.count(Outcome::NormalReset), 0);
    assert_eq!(tally.iter().count(), 4);
}

#[test]
fn throughput_needs_a_full_second() {
    assert_eq!(throughput(100, 100, 42), None);
    assert_eq!(throughput(100, 103, 10), Some(3));
}

#[test]
fn trial_zero_starts_a_run() {
    let record = TrialRecord::new(
        0,
        TrialParameters::new(100, 50),
        Outcome::Success,
        RawResponse::new(b"ok".to_vec()),
    );
    assert!(record.starts_run());
    assert_eq!(record.parameters(), TrialParameters::new(100, 50));
    assert_eq!(record.clone().with_clock_hz(200_000_000).clock_hz, Some(200_000_000));
}

#[test]
fn metadata_skips_program_name() {
    let meta = RunMetadata::from_args(["glitch-run", "dry-run", "--config", "run.yaml"]);
    assert_eq!(meta.invocation_arguments, "dry-run --config run.yaml");
    assert!(meta.start_time > 0);
}

#[test]
fn response_lines_strip_carriage_returns() {
    let response = RawResponse::new(b"boot\r\nready\r\n\r\n".to_vec());
    assert_eq!(response.lines(), vec!["boot".to_string(), "ready".to_string()]);
    assert!(response.contains(b"ready"));
    assert!(!response.contains(b""));
}

#[test]
fn record_serializes_response_as_bytes() {
    let record = TrialRecord::new(
        3,
        TrialParameters::new(10, 5),
        Outcome::Anomaly,
        RawResponse::new(vec![0xde, 0xad]),
    );
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["outcome"], "anomaly");
    assert_eq!(json["raw_response"], serde_json::json!([222, 173]));
    assert!(json.get("clock_hz").is_none());
}
