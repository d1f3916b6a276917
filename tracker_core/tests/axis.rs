use rstest::rstest;
use tracker_core::mocks::NoopLight;
use tracker_core::{
    ActuatorCfg, AutoBlockCfg, AxisCfg, AxisId, AxisOverrides, AxisUnit, SensorCfg,
};
use tracker_hardware::RecordingBridge;

fn cfg() -> AxisCfg {
    AxisCfg {
        sensor: SensorCfg {
            read_ms: 0,
            action_ms: 0,
        },
        actuator: ActuatorCfg {
            update_ms: 0,
            kick_ms: 0,
            ..ActuatorCfg::default()
        },
        ..AxisCfg::default()
    }
}

#[rstest]
fn externally_fed_samples_drive_the_bridge() {
    let bridge = RecordingBridge::new();
    let writes = bridge.log();
    let mut axis = AxisUnit::new(AxisId::V, cfg(), NoopLight, Some(bridge));

    // The pair itself cannot be read.
    assert!(axis.sense(0).is_none());
    assert_eq!(axis.read_failures(), 1);
    assert!(!axis.has_diff_sample());

    let sample = axis.sense_with(1, 700, 300).expect("window of one");
    assert_eq!(sample.diff_percent, 40.0);
    assert_eq!(axis.drive(1).expect("drive"), Some(axis.duty()));
    assert_eq!(writes.borrow().last(), Some(&(252, 0)));

    let log = axis.consume_log().expect("log record");
    assert_eq!(log.axis, AxisId::V);
    assert_eq!(log.applied_raw, 252);
    assert!(axis.consume_log().is_none());
}

#[rstest]
fn target_override_replaces_computed_target() {
    let mut axis = AxisUnit::new(AxisId::H, cfg(), NoopLight, None::<RecordingBridge>);
    axis.sense_with(0, 700, 300);
    axis.set_overrides(AxisOverrides {
        target: Some(-0.5),
        enabled: None,
    });
    axis.drive(0).expect("drive");
    assert!((axis.applied_norm() + 0.5).abs() < 1e-6);
    assert!((axis.computed_target() - 0.99).abs() < 1e-6);
    assert!(axis.is_motor_enabled());
}

#[rstest]
fn enable_override_forces_stop_and_releases_cleanly() {
    let bridge = RecordingBridge::new();
    let writes = bridge.log();
    let mut axis = AxisUnit::new(AxisId::H, cfg(), NoopLight, Some(bridge));
    axis.sense_with(0, 300, 700);
    axis.set_overrides(AxisOverrides {
        target: None,
        enabled: Some(false),
    });
    axis.drive(0).expect("drive");
    assert_eq!(writes.borrow().last(), Some(&(0, 0)));

    axis.set_overrides(AxisOverrides::NONE);
    axis.drive(1).expect("drive");
    assert_eq!(writes.borrow().last(), Some(&(0, 252)));
}

#[rstest]
fn tracking_only_axis_never_writes() {
    let mut axis = AxisUnit::new(AxisId::V, cfg(), NoopLight, None::<RecordingBridge>);
    assert!(!axis.has_bridge());
    axis.sense_with(0, 900, 100);
    assert!(axis.drive(0).expect("drive").is_some());
    assert!(axis.stop(1).expect("stop").is_stopped());
}

#[rstest]
fn override_target_is_clamped() {
    let o = AxisOverrides {
        target: Some(3.0),
        enabled: None,
    };
    assert_eq!(o.resolve_target(0.2), 1.0);
    assert!(o.resolve_enabled());
    assert_eq!(AxisOverrides::NONE.resolve_target(0.2), 0.2);
}

fn auto_block_axis() -> (AxisUnit<NoopLight, RecordingBridge>, tracker_hardware::BridgeLog) {
    let bridge = RecordingBridge::new();
    let writes = bridge.log();
    let cfg = AxisCfg {
        auto_block: AutoBlockCfg {
            enabled: true,
            hold_ms: 100,
            block_ms: 500,
        },
        ..cfg()
    };
    (AxisUnit::new(AxisId::H, cfg, NoopLight, Some(bridge)), writes)
}

#[rstest]
fn auto_block_holds_the_motor_off_after_settling() {
    let (mut axis, writes) = auto_block_axis();
    // No sample yet: never blocked.
    axis.drive(0).expect("drive");
    assert!(axis.is_motor_enabled());

    axis.sense_with(1, 500, 500);
    for t in 1..101 {
        axis.drive(t).expect("drive");
        assert!(axis.is_motor_enabled(), "blocked early at {t}");
    }
    axis.drive(101).expect("drive");
    assert!(axis.is_auto_blocked());
    assert!(!axis.is_motor_enabled());

    // Off-centre light mid-window does not release the block.
    axis.sense_with(300, 300, 700);
    axis.drive(300).expect("drive");
    assert!(!axis.is_motor_enabled());
    assert_eq!(writes.borrow().last(), Some(&(0, 0)));

    // Window over and still off-centre: driving again.
    axis.drive(601).expect("drive");
    assert!(axis.is_motor_enabled());
    assert!(!axis.is_auto_blocked());
    assert_eq!(writes.borrow().last(), Some(&(0, 252)));
}

#[rstest]
fn auto_block_yields_to_an_enable_override() {
    let (mut axis, _) = auto_block_axis();
    axis.sense_with(0, 500, 500);
    for t in 0..200 {
        axis.drive(t).expect("drive");
    }
    assert!(axis.is_auto_blocked());

    axis.set_overrides(AxisOverrides {
        target: None,
        enabled: Some(true),
    });
    axis.drive(200).expect("drive");
    assert!(axis.is_motor_enabled());
    assert!(!axis.is_auto_blocked());

    axis.set_overrides(AxisOverrides::NONE);
    axis.set_auto_block_enabled(false);
    for t in 201..400 {
        axis.drive(t).expect("drive");
    }
    assert!(axis.is_motor_enabled());
}
