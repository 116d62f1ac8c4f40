use glitch_core::{GlitchError, GlitchGenerator, TrialParameters};
use glitch_ctl::{ArmState, GlitchArming, SimulatedGenerator};

fn armed_at_200_mhz() -> GlitchArming<SimulatedGenerator> {
    GlitchArming::new(SimulatedGenerator::new(200_000_000)).expect("arming")
}

#[test]
fn starts_enabled_and_idle() {
    let arming = armed_at_200_mhz();
    assert!(arming.is_enabled());
    assert!(arming.generator().is_enabled());
    assert_eq!(arming.state(), ArmState::Idle);
    assert_eq!(arming.last_counts(), None);
}

#[test]
fn arm_programs_offset_and_repeat() {
    let mut arming = armed_at_200_mhz();
    let counts = arming.arm(TrialParameters::new(100, 50)).expect("arm");
    assert_eq!(counts.offset_cycles, 20);
    assert_eq!(counts.repeat_cycles, 10);
    assert_eq!(arming.generator().counts(), counts);
    assert_eq!(arming.state(), ArmState::Armed);
    assert!(arming.generator().is_armed());
}

#[test]
fn capture_returns_to_idle() {
    let mut arming = armed_at_200_mhz();
    arming.arm(TrialParameters::new(1_000, 25)).expect("arm");
    arming.capture().expect("capture");
    assert_eq!(arming.state(), ArmState::Idle);
    assert_eq!(arming.generator().capture_count(), 1);
}

#[test]
fn capture_without_arm_is_rejected() {
    let mut arming = armed_at_200_mhz();
    let err = arming.capture().unwrap_err();
    assert!(matches!(err, GlitchError::Protocol(_)));
    assert_eq!(arming.generator().capture_count(), 0);
}

#[test]
fn disable_while_armed_is_rejected() {
    let mut arming = armed_at_200_mhz();
    arming.arm(TrialParameters::new(100, 50)).expect("arm");
    let err = arming.disable().unwrap_err();
    assert_eq!(err.info().code, "arming.disable_armed");
    assert!(arming.is_enabled());

    arming.capture().expect("capture");
    arming.disable().expect("disable after capture");
    assert!(!arming.generator().is_enabled());
    arming.enable().expect("enable");
    assert!(arming.generator().is_enabled());
}

#[test]
fn unreachable_generator_fails_the_arm() {
    let mut arming = armed_at_200_mhz();
    arming.generator_mut().set_unreachable(true);
    let err = arming.arm(TrialParameters::new(100, 50)).unwrap_err();
    assert!(matches!(err, GlitchError::Hardware(_)));
    assert_eq!(arming.state(), ArmState::Idle);
    assert_eq!(arming.generator().arm_count(), 0);
}

#[test]
fn zero_clock_generator_is_a_config_error() {
    let err = GlitchArming::new(SimulatedGenerator::new(0)).unwrap_err();
    assert!(matches!(err, GlitchError::Config(_)));
}
