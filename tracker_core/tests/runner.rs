//! Closed-loop runs against the simulated plant on a virtual clock.

use std::sync::atomic::{AtomicBool, Ordering};

use rstest::rstest;
use tracker_core::runner::run;
use tracker_core::{
    ActuatorCfg, AxisCfg, ButtonCfg, ModeSupervisor, RunParams, SensorCfg, SleepCfg, StopReason,
    SupervisorCfg, SweepState, SystemMode, TouchButton, TrackingCfg,
};
use tracker_hardware::{PlantAxis, PlantParams, ScriptedButton, SimPlant, SimPower};
use tracker_traits::WakeCause;
use tracker_traits::clock::test_clock::TestClock;

fn axis_cfg() -> AxisCfg {
    AxisCfg {
        sensor: SensorCfg {
            read_ms: 1,
            action_ms: 20,
        },
        tracking: TrackingCfg {
            pwm_min_norm: 0.3,
            ..TrackingCfg::default()
        },
        actuator: ActuatorCfg {
            update_ms: 10,
            ..ActuatorCfg::default()
        },
        log: false,
        ..AxisCfg::default()
    }
}

fn sup_cfg() -> SupervisorCfg {
    SupervisorCfg {
        sleep: SleepCfg {
            hold_ms: 600_000,
            wake_interval_ms: 60_000,
            ..SleepCfg::default()
        },
        ..SupervisorCfg::default()
    }
}

fn build(plant: &SimPlant) -> ModeSupervisor {
    let cfg = sup_cfg();
    let active_high = cfg.endstop.active_high;
    ModeSupervisor::builder()
        .with_config(cfg)
        .with_axis_h(
            axis_cfg(),
            plant.light_pair(PlantAxis::H),
            Some(Box::new(plant.bridge(PlantAxis::H))),
        )
        .with_axis_v(
            axis_cfg(),
            plant.light_pair(PlantAxis::V),
            Some(Box::new(plant.bridge(PlantAxis::V))),
        )
        .with_limits(plant.limits(PlantAxis::H, active_high))
        .build()
        .expect("build supervisor")
}

fn params(max_ticks: u64) -> RunParams {
    RunParams {
        tick_ms: 1,
        max_ticks: Some(max_ticks),
        ..RunParams::default()
    }
}

#[rstest]
fn converges_on_a_fixed_sun() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true);
    let mut power = SimPower::new(clock.clone());
    let shutdown = AtomicBool::new(false);

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(20_000),
        &shutdown,
        |_, _| {},
    )
    .expect("run");

    assert_eq!(summary.stopped_by, StopReason::MaxTicks);
    assert_eq!(summary.ticks, 20_000);
    assert_eq!(summary.final_mode, SystemMode::Active);
    for axis in [PlantAxis::H, PlantAxis::V] {
        let err = (plant.angle(axis) - plant.sun(axis)).abs();
        assert!(err < 2.0, "{axis:?} still {err} deg off");
    }
}

#[rstest]
fn long_press_sleeps_after_release_and_wakes_on_timer() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true).press(1_000, 2_000);
    let mut power = SimPower::new(clock.clone()).with_wake_cause(WakeCause::Timer);
    let sleeps = power.log();
    let shutdown = AtomicBool::new(false);

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &RunParams {
            max_sleeps: Some(1),
            ..params(100_000)
        },
        &shutdown,
        |_, _| {},
    )
    .expect("run");

    assert_eq!(summary.stopped_by, StopReason::MaxSleeps);
    assert_eq!(summary.sleeps, 1);
    // Debounced press at 1040, long press 1500 ms later.
    assert_eq!(summary.ticks, 2_541);
    assert_eq!(summary.final_mode, SystemMode::Sleep);

    let sleeps = sleeps.borrow();
    assert_eq!(sleeps.len(), 1);
    // Entered only once the release was debounced.
    assert_eq!(sleeps[0].at_ms, 3_040);
    assert_eq!(sleeps[0].wake_after_ms, 60_000);
    assert!(sleeps[0].wake_on_touch);
    assert_eq!(summary.elapsed_ms, 63_040);
    assert_eq!(plant.duty(PlantAxis::H), 0.0);
    assert_eq!(plant.duty(PlantAxis::V), 0.0);
}

#[rstest]
fn shutdown_flag_stops_the_loop() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true);
    let mut power = SimPower::new(clock.clone());
    let shutdown = AtomicBool::new(false);

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &RunParams::default(),
        &shutdown,
        |_, now| {
            if now >= 100 {
                shutdown.store(true, Ordering::Relaxed);
            }
        },
    )
    .expect("run");
    assert_eq!(summary.stopped_by, StopReason::Shutdown);
    assert_eq!(summary.ticks, 101);
}

#[rstest]
fn timer_boot_starts_in_sleep_mode() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true);
    let mut power = SimPower::new(clock.clone()).with_boot_cause(WakeCause::Timer);
    let shutdown = AtomicBool::new(false);

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(1),
        &shutdown,
        |_, _| {},
    )
    .expect("run");
    assert_eq!(summary.final_mode, SystemMode::Sleep);
    assert!(!sup.coordinator().is_enabled());
}

#[rstest]
fn failed_light_reads_show_up_in_summary() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    plant.fail_light_reads(PlantAxis::H, 7);
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true);
    let mut power = SimPower::new(clock.clone());
    let shutdown = AtomicBool::new(false);

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(500),
        &shutdown,
        |_, _| {},
    )
    .expect("run");
    assert_eq!(summary.light_read_failures, 7);
}

#[rstest]
fn bridge_fault_stops_the_run_and_the_other_motor() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true);
    let mut power = SimPower::new(clock.clone());
    let shutdown = AtomicBool::new(false);

    let err = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(10_000),
        &shutdown,
        |_, now| {
            if now == 500 {
                plant.set_bridge_failing(PlantAxis::H, true);
            }
        },
    )
    .expect_err("bridge fault must end the run");

    assert!(err.to_string().starts_with("control tick at "));
    assert!(
        err.chain().any(|c| c.to_string() == "axis h bridge write"),
        "chain: {err:?}"
    );
    assert_eq!(plant.duty(PlantAxis::V), 0.0);
}

#[rstest]
fn limit_hit_sweeps_to_the_far_end() {
    let clock = TestClock::new();
    let plant = SimPlant::new(
        PlantParams {
            sun_h_deg: -120.0,
            axis_h_deg: -85.0,
            ..PlantParams::default()
        },
        clock.clone(),
    );
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true);
    let mut power = SimPower::new(clock.clone());
    let shutdown = AtomicBool::new(false);
    let mut transitions = vec![SweepState::Idle];
    let mut reached_b = false;

    run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(45_000),
        &shutdown,
        |sup, _| {
            let state = sup.sweep_state();
            if transitions.last() != Some(&state) {
                transitions.push(state);
            }
            reached_b |= plant.limits_closed(PlantAxis::H).1;
        },
    )
    .expect("run");

    assert!(
        transitions.starts_with(&[SweepState::Idle, SweepState::LeavingA, SweepState::Idle]),
        "{transitions:?}"
    );
    assert!(reached_b);
}

#[rstest]
fn touch_boot_with_finger_still_on_pad_stays_active() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    let mut input = ScriptedButton::new(clock.clone(), true).press(0, 200);
    let mut power = SimPower::new(clock.clone()).with_boot_cause(WakeCause::External);
    let shutdown = AtomicBool::new(false);
    let mut modes = Vec::new();

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(1_000),
        &shutdown,
        |sup, _| {
            if modes.last() != Some(&sup.mode()) {
                modes.push(sup.mode());
            }
        },
    )
    .expect("run");

    assert_eq!(summary.final_mode, SystemMode::Active);
    assert_eq!(modes, vec![SystemMode::Active]);
}

#[rstest]
fn touch_wake_with_finger_still_on_pad_stays_active() {
    let clock = TestClock::new();
    let plant = SimPlant::new(PlantParams::default(), clock.clone());
    let mut sup = build(&plant);
    let mut button = TouchButton::new(ButtonCfg::default());
    // Long press to sleep, then the touch that wakes it is still held at wake-up.
    let mut input = ScriptedButton::new(clock.clone(), true)
        .press(1_000, 2_000)
        .press(63_040, 200);
    let mut power = SimPower::new(clock.clone()).with_wake_cause(WakeCause::External);
    let sleeps = power.log();
    let shutdown = AtomicBool::new(false);

    let summary = run(
        &mut sup,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &params(3_541),
        &shutdown,
        |_, _| {},
    )
    .expect("run");

    assert_eq!(summary.sleeps, 1);
    assert_eq!(sleeps.borrow()[0].at_ms, 3_040);
    // 1000 ticks after waking at 63040, well past the release at 63240.
    assert_eq!(summary.elapsed_ms, 64_040);
    assert_eq!(summary.final_mode, SystemMode::Active);
}
