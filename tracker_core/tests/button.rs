use rstest::{fixture, rstest};
use tracker_core::{ButtonCfg, ButtonEvent, TouchButton};
use tracker_hardware::ScriptedButton;
use tracker_traits::clock::test_clock::TestClock;

#[fixture]
fn cfg() -> ButtonCfg {
    ButtonCfg {
        active_high: true,
        debounce_ms: 40,
        long_press_ms: 1_500,
        release_wait_ms: 3_000,
    }
}

/// Feed a press of `hold_ms` at 1 ms resolution and collect events.
fn run_press(button: &mut TouchButton, hold_ms: u64, tail_ms: u64) -> Vec<(u64, ButtonEvent)> {
    let mut events = Vec::new();
    for t in 0..hold_ms + tail_ms {
        button.update(t < hold_ms, t);
        if let Some(ev) = button.take_event() {
            events.push((t, ev));
        }
    }
    events
}

#[rstest]
fn short_press_fires_on_release(cfg: ButtonCfg) {
    let mut b = TouchButton::new(cfg);
    let events = run_press(&mut b, 300, 100);
    assert_eq!(events, vec![(340, ButtonEvent::ShortPress)]);
}

#[rstest]
fn long_press_fires_once_while_held(cfg: ButtonCfg) {
    let mut b = TouchButton::new(cfg);
    let events = run_press(&mut b, 4_000, 100);
    // Pressed at 40 (debounced), long at 40 + 1500; no short on release.
    assert_eq!(events, vec![(1_540, ButtonEvent::LongPress)]);
    assert!(!b.is_pressed());
}

#[rstest]
fn glitch_shorter_than_debounce_is_ignored(cfg: ButtonCfg) {
    let mut b = TouchButton::new(cfg);
    let events = run_press(&mut b, 20, 200);
    assert!(events.is_empty());
}

#[rstest]
fn active_low_polarity(cfg: ButtonCfg) {
    let mut b = TouchButton::new(ButtonCfg {
        active_high: false,
        ..cfg
    });
    for t in 0..100 {
        b.update(true, t);
    }
    assert!(!b.is_pressed());
    for t in 100..200 {
        b.update(false, t);
    }
    assert!(b.is_pressed());
}

#[rstest]
fn poll_reads_scripted_input(cfg: ButtonCfg) {
    let clock = TestClock::new();
    let mut input = ScriptedButton::new(clock.clone(), true).press(100, 200);
    let mut b = TouchButton::new(cfg);
    let mut seen = None;
    for _ in 0..500 {
        if let Some(ev) = b.poll(&mut input, clock.elapsed_ms()) {
            seen = Some((clock.elapsed_ms(), ev));
        }
        clock.advance_ms(1);
    }
    assert_eq!(seen, Some((340, ButtonEvent::ShortPress)));
}

#[rstest]
fn sync_while_held_swallows_that_press(cfg: ButtonCfg) {
    let mut b = TouchButton::new(cfg);
    b.sync(true);
    assert!(b.is_pressed());
    let mut events = Vec::new();
    for t in 0..3_000 {
        b.update(t < 2_000, t);
        events.extend(b.take_event());
    }
    assert!(events.is_empty(), "{events:?}");

    // The next press is seen normally.
    for t in 3_000..3_400 {
        b.update(t < 3_300, t);
        events.extend(b.take_event());
    }
    assert_eq!(events, vec![ButtonEvent::ShortPress]);
}
