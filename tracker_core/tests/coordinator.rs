use rstest::{fixture, rstest};
use tracker_core::{CoordinatorCfg, CoordinatorPhase, DualAxisCoordinator};

#[fixture]
fn coord() -> DualAxisCoordinator {
    DualAxisCoordinator::new(CoordinatorCfg {
        enabled: true,
        deadband_h_pct: 2.0,
        deadband_v_pct: 3.0,
        hold_ms: 1_000,
        block_ms: 5_000,
    })
}

const IN: (Option<f32>, Option<f32>) = (Some(1.0), Some(-2.5));
const OUT: (Option<f32>, Option<f32>) = (Some(1.0), Some(-4.0));

#[rstest]
fn blocks_after_hold_and_rearms_while_still_settled(mut coord: DualAxisCoordinator) {
    assert_eq!(coord.tick(0, IN.0, IN.1), Some(true));
    assert_eq!(coord.phase(), CoordinatorPhase::Holding);
    assert_eq!(coord.tick(999, IN.0, IN.1), Some(true));
    assert_eq!(coord.tick(1_000, IN.0, IN.1), Some(false));
    assert_eq!(coord.state().block_until_ms, Some(6_000));

    // Leaving the deadband mid-window does not unblock.
    assert_eq!(coord.tick(3_000, OUT.0, OUT.1), Some(false));

    // Window ends while settled: re-armed.
    assert_eq!(coord.tick(6_000, IN.0, IN.1), Some(false));
    assert_eq!(coord.state().block_until_ms, Some(11_000));

    // Window ends while outside: unblocked and timers cleared.
    assert_eq!(coord.tick(11_000, OUT.0, OUT.1), Some(true));
    assert_eq!(coord.phase(), CoordinatorPhase::Unblocked);
    assert_eq!(*coord.state(), Default::default());
}

#[rstest]
fn leaving_deadband_during_hold_restarts_it(mut coord: DualAxisCoordinator) {
    coord.tick(0, IN.0, IN.1);
    coord.tick(900, OUT.0, OUT.1);
    coord.tick(950, IN.0, IN.1);
    assert_eq!(coord.tick(1_500, IN.0, IN.1), Some(true));
    assert_eq!(coord.tick(1_950, IN.0, IN.1), Some(false));
}

#[rstest]
fn missing_sample_never_blocks(mut coord: DualAxisCoordinator) {
    for t in (0..10_000).step_by(100) {
        assert_eq!(coord.tick(t, Some(0.0), None), Some(true));
    }
    assert_eq!(coord.phase(), CoordinatorPhase::Unblocked);
}

#[rstest]
fn disabled_has_no_opinion_and_reenable_resets(mut coord: DualAxisCoordinator) {
    coord.tick(0, IN.0, IN.1);
    coord.tick(1_000, IN.0, IN.1);
    assert!(coord.is_blocked());

    coord.set_enabled(false);
    assert_eq!(coord.tick(1_100, IN.0, IN.1), None);
    assert!(!coord.is_blocked());

    coord.set_enabled(true);
    assert_eq!(coord.tick(1_200, IN.0, IN.1), Some(true));
    assert_eq!(coord.phase(), CoordinatorPhase::Holding);
}

#[rstest]
fn block_can_start_at_tick_zero() {
    let mut coord = DualAxisCoordinator::new(CoordinatorCfg {
        hold_ms: 0,
        ..CoordinatorCfg::default()
    });
    assert_eq!(coord.tick(0, Some(0.0), Some(0.0)), Some(false));
    assert_eq!(coord.state().block_until_ms, Some(10_000));
}
