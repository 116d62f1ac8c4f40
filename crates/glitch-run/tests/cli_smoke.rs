use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn glitch_run() -> Command {
    Command::new(env!("CARGO_BIN_EXE_glitch-run"))
}

#[test]
fn cycles_prints_translation_table() {
    let output = glitch_run()
        .args(["cycles", "--freq-hz", "200000000", "27", "100"])
        .output()
        .expect("spawn");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("5 ns per cycle"));
    let row: Vec<&str> = stdout
        .lines()
        .find(|line| line.trim_start().starts_with("27 "))
        .expect("row for 27 ns")
        .split_whitespace()
        .collect();
    assert_eq!(row, vec!["27", "5", "25", "2"]);
}

#[test]
fn cycles_rejects_zero_frequency() {
    let status = glitch_run()
        .args(["cycles", "--freq-hz", "0", "27"])
        .status()
        .expect("spawn");
    assert!(!status.success());
}

#[test]
fn classify_prints_outcome() {
    let output = glitch_run()
        .args([
            "classify",
            "--expected",
            "OK",
            "--response",
            "rst: Falling back",
            "--no-color",
        ])
        .output()
        .expect("spawn");
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "normal_reset (R)");
}

fn classify_output(extra: &[&str], force_color: bool) -> String {
    let mut cmd = glitch_run();
    cmd.args(["classify", "--expected", "OK", "--response", "Fatal exception (0)"])
        .args(extra)
        .env_remove("NO_COLOR")
        .env_remove("CLICOLOR");
    if force_color {
        cmd.env("CLICOLOR_FORCE", "1");
    } else {
        cmd.env_remove("CLICOLOR_FORCE");
    }
    let output = cmd.output().expect("spawn");
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn classify_colours_when_forced() {
    let stdout = classify_output(&[], true);
    assert!(stdout.contains("\x1b[35m"), "{stdout:?}");
    assert!(stdout.contains("crash (M)"));
}

#[test]
fn no_color_flag_beats_forced_colour() {
    let stdout = classify_output(&["--no-color"], true);
    assert_eq!(stdout.trim(), "crash (M)");
}

#[test]
fn piped_output_is_plain() {
    let stdout = classify_output(&[], false);
    assert!(!stdout.contains('\x1b'), "{stdout:?}");
}

#[test]
fn dry_run_records_and_summarises() {
    let dir = tempdir().expect("dir");
    let config = dir.path().join("run.yaml");
    let script = dir.path().join("script.yaml");
    let db = dir.path().join("run.sqlite");
    fs::write(
        &config,
        "generator:\n  clock_hz: 200000000\nresync:\n  token: Ready\n  reset_time_ms: 0\nrecorder:\n  directory: databases\n",
    )
    .unwrap();
    fs::write(
        &script,
        r#"stimulus: "go"
expected: "OK"
trials:
  - delay_ns: 100
    length_ns: 50
    boot: ["boot\r\n", "Ready\r\n"]
    response: "OK"
  - delay_ns: 105
    length_ns: 50
    boot: ["Ready"]
    response: "Fatal exception (0)"
  - delay_ns: 110
    length_ns: 50
    response: "Falling"
"#,
    )
    .unwrap();

    let output = glitch_run()
        .args(["dry-run", "--no-color", "--config"])
        .arg(&config)
        .arg("--script")
        .arg(&script)
        .arg("--db")
        .arg(&db)
        .output()
        .expect("spawn");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("success"));
    assert!(stdout.contains("crash"));

    let summary = glitch_run()
        .args(["summary", "--db"])
        .arg(&db)
        .output()
        .expect("spawn");
    assert!(summary.status.success());
    let text = String::from_utf8(summary.stdout).unwrap();
    assert!(text.contains("trials: 3"));

    let records = glitch_run()
        .args(["records", "--format", "json", "--db"])
        .arg(&db)
        .output()
        .expect("spawn");
    assert!(records.status.success());
    let dump: serde_json::Value = serde_json::from_slice(&records.stdout).expect("json");
    let trials = dump["trials"].as_array().unwrap();
    assert_eq!(trials.len(), 3);
    assert_eq!(trials[0]["outcome"], "success");
    assert_eq!(trials[1]["outcome"], "crash");
    assert_eq!(trials[2]["outcome"], "normal_reset");
    assert_eq!(dump["metadata"].as_array().unwrap().len(), 1);
}
