use rstest::rstest;
use tracker_config::{AxisName, Config, load_toml};

fn assert_rejects(toml: &str, needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("config should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected error containing {needle:?}, got: {err}"
    );
}

#[test]
fn empty_document_uses_defaults_and_is_valid() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults are valid");

    assert_eq!(cfg.axis_h.read_ms(AxisName::H), 3);
    assert_eq!(cfg.axis_h.action_ms(AxisName::H), 120);
    assert_eq!(cfg.axis_v.read_ms(AxisName::V), 25);
    assert_eq!(cfg.axis_v.action_ms(AxisName::V), 500);
    assert!(cfg.axis_h.has_bridge());
    assert!(!cfg.axis_v.has_bridge());
    assert_eq!(cfg.coordinator.hold_ms, 1_500);
    assert_eq!(cfg.coordinator.block_ms, 10_000);
    assert_eq!(cfg.endstop.dir_from_a, 1);
    assert_eq!(cfg.endstop.dir_from_b, -1);
    assert_eq!(cfg.sleep.wake_interval_ms, 600_000);
    assert_eq!(cfg.display.refresh_ms, 500);
    assert_eq!(cfg.runner.tick_ms, 1);
}

#[test]
fn partial_vertical_section_keeps_vertical_timing() {
    let cfg = load_toml(
        r#"
[axis_v]
deadband_pct = 2.5
"#,
    )
    .expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.axis_v.read_ms(AxisName::V), 25);
    assert_eq!(cfg.axis_v.deadband_pct, 2.5);
    assert!(!cfg.axis_v.has_bridge());
}

#[test]
fn full_document_parses() {
    let toml = r#"
[axis_h]
ldr_a = 33
ldr_b = 35
in1 = 16
in2 = 17
read_ms = 5
action_ms = 100
update_ms = 20
deadband_pct = 1.5
pwm_threshold_pct = 12.0
pwm_min_norm = 0.7
pwm_max_norm = 0.95
pwm_res_bits = 10
smooth = 0.3
kick_norm = 0.85
kick_ms = 150
low_light = [
  { level = 800, deadband_pct = 3.0 },
  { level = 400, deadband_pct = 8.0 },
  { level = 100, deadband_pct = 100.0 },
]

[axis_v]
in1 = 18
in2 = 19

[coordinator]
enabled = false
deadband_h_pct = 2.0

[endstop]
pin_a = 32
pin_b = 39
active_high = true
axis = "v"
dir_from_a = -1
dir_from_b = 1

[button]
pin = 27
long_press_ms = 2000

[sleep]
auto_from_active = false

[environment]
samples = 1

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.axis_h.low_light.len(), 3);
    assert_eq!(cfg.axis_h.pwm_res_bits, 10);
    assert_eq!(cfg.endstop.axis, AxisName::V);
    assert!(cfg.axis_v.has_bridge());
    assert_eq!(cfg.coordinator.deadband_h_pct, Some(2.0));
    assert_eq!(cfg.coordinator.deadband_v_pct, None);
}

#[test]
fn default_impl_matches_empty_document() {
    let from_toml = load_toml("").unwrap();
    let dflt = Config::default();
    assert_eq!(from_toml.axis_h.in1, dflt.axis_h.in1);
    assert_eq!(from_toml.axis_v.in1, dflt.axis_v.in1);
    assert_eq!(from_toml.environment.pin, dflt.environment.pin);
}

#[rstest]
#[case("[axis_h]\nread_ms = 0", "axis_h.read_ms must be >= 1")]
#[case("[axis_h]\nread_ms = 50\naction_ms = 10", "axis_h.action_ms must be >= axis_h.read_ms")]
#[case("[axis_v]\nupdate_ms = 60000", "axis_v.update_ms is unreasonably large")]
#[case("[axis_v]\nin1 = 4", "axis_v.in1 and axis_v.in2 must be set together")]
#[case("[axis_h]\nin1 = 4\nin2 = 4", "must be different pins")]
#[case("[axis_h]\ndeadband_pct = 120.0", "axis_h.deadband_pct must be in [0.0, 100.0]")]
#[case("[axis_h]\ndeadband_pct = -1.0", "axis_h.deadband_pct must be in [0.0, 100.0]")]
#[case("[axis_h]\npwm_max_norm = 1.2", "axis_h.pwm_max_norm must be in [0.0, 1.0]")]
#[case("[axis_h]\nsmooth = 1.5", "axis_h.smooth must be in [0.0, 1.0]")]
#[case("[axis_h]\npwm_res_bits = 0", "axis_h.pwm_res_bits must be in 1..=16")]
#[case("[axis_h]\npwm_res_bits = 17", "axis_h.pwm_res_bits must be in 1..=16")]
#[case("[coordinator]\nblock_ms = 0", "coordinator.block_ms must be >= 1")]
#[case("[endstop]\ndir_from_a = 2", "endstop.dir_from_a must be +1 or -1")]
#[case("[endstop]\ndir_from_a = -1", "must differ")]
#[case("[endstop]\nsweep_norm = 0.0", "endstop.sweep_norm must be in (0.0, 1.0]")]
#[case("[endstop]\npin_a = 5\npin_b = 5", "must be different pins")]
#[case("[button]\ndebounce_ms = 100\nlong_press_ms = 100", "button.long_press_ms must be > button.debounce_ms")]
#[case("[environment]\nsamples = 0", "environment.samples must be >= 1")]
#[case("[display]\nrefresh_ms = 0", "display.refresh_ms must be >= 1")]
#[case("[runner]\ntick_ms = 0", "runner.tick_ms must be >= 1")]
#[case("[axis_v]\nauto_block = true\nauto_block_ms = 0", "axis_v.auto_block_ms must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    assert_rejects(toml, needle);
}

#[rstest]
#[case(
    "[axis_h]\nlow_light = [{ level = 100, deadband_pct = 5.0 }, { level = 400, deadband_pct = 8.0 }]",
    "strictly descending"
)]
#[case(
    "[axis_h]\nlow_light = [{ level = 400, deadband_pct = 8.0 }, { level = 100, deadband_pct = 5.0 }]",
    "must not decrease"
)]
#[case(
    "[axis_h]\nlow_light = [{ level = 4, deadband_pct = 1.0 }, { level = 3, deadband_pct = 1.0 }, { level = 2, deadband_pct = 1.0 }, { level = 1, deadband_pct = 1.0 }]",
    "at most 3 levels"
)]
fn rejects_bad_low_light_tables(#[case] toml: &str, #[case] needle: &str) {
    assert_rejects(toml, needle);
}

#[test]
fn disabled_low_light_levels_are_skipped_in_ordering() {
    let cfg = load_toml(
        "[axis_h]\nlow_light = [{ level = 500, deadband_pct = 4.0 }, { level = 0, deadband_pct = 0.0 }, { level = 200, deadband_pct = 6.0 }]",
    )
    .unwrap();
    cfg.validate().expect("disabled level in the middle is fine");
}

#[test]
fn unknown_axis_name_fails_to_parse() {
    let err = load_toml("[endstop]\naxis = \"z\"").expect_err("unknown variant");
    assert!(format!("{err}").contains("unknown variant"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/tracker_config.toml")).expect("parse sample");
    cfg.validate().expect("sample is valid");
    assert!(cfg.axis_h.has_bridge());
    assert!(!cfg.axis_v.has_bridge());
    assert_eq!(cfg.axis_h.low_light.len(), 3);
}
