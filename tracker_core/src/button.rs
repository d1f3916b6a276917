//! Touch/mode button: short and long press detection.

use tracker_traits::ButtonInput;

use crate::config::ButtonCfg;
use crate::debounce::Debouncer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Released before the long-press threshold.
    ShortPress,
    /// Held for `long_press_ms`; fires once per press, while still held.
    LongPress,
}

#[derive(Debug, Clone)]
pub struct TouchButton {
    cfg: ButtonCfg,
    debouncer: Debouncer,
    press_start_ms: Option<u64>,
    long_fired: bool,
    pending: Option<ButtonEvent>,
}

impl TouchButton {
    pub fn new(cfg: ButtonCfg) -> Self {
        let debouncer = Debouncer::new(cfg.debounce_ms, false);
        Self {
            cfg,
            debouncer,
            press_start_ms: None,
            long_fired: false,
            pending: None,
        }
    }

    /// Feed a raw electrical level (polarity is applied here).
    pub fn update(&mut self, raw_level: bool, now_ms: u64) {
        let pressed = raw_level == self.cfg.active_high;
        self.debouncer.update(pressed, now_ms);

        if self.debouncer.take_rising_edge() {
            self.press_start_ms = Some(now_ms);
            self.long_fired = false;
        }

        if self.debouncer.is_pressed()
            && !self.long_fired
            && let Some(start) = self.press_start_ms
            && now_ms.saturating_sub(start) >= self.cfg.long_press_ms
        {
            self.long_fired = true;
            self.pending = Some(ButtonEvent::LongPress);
        }

        if self.debouncer.take_falling_edge() {
            if self.press_start_ms.is_some() && !self.long_fired {
                self.pending = Some(ButtonEvent::ShortPress);
            }
            self.press_start_ms = None;
            self.long_fired = false;
        }
    }

    /// Read `input` and update. A read failure leaves the level unchanged.
    pub fn poll<I: ButtonInput + ?Sized>(&mut self, input: &mut I, now_ms: u64) -> Option<ButtonEvent> {
        match input.read_level() {
            Ok(level) => self.update(level, now_ms),
            Err(e) => {
                tracing::warn!(error = %e, "button read failed");
            }
        }
        self.take_event()
    }

    /// Take `raw_level` as already stable and forget any press in progress.
    /// A finger still on the pad after boot or a wake-up yields no event.
    pub fn sync(&mut self, raw_level: bool) {
        self.debouncer.reset(raw_level == self.cfg.active_high);
        self.press_start_ms = None;
        self.long_fired = false;
        self.pending = None;
    }

    /// Read `input` and `sync` to it. A read failure keeps the current state.
    pub fn sync_from<I: ButtonInput + ?Sized>(&mut self, input: &mut I) {
        match input.read_level() {
            Ok(level) => self.sync(level),
            Err(e) => {
                tracing::warn!(error = %e, "button read failed, not resynced");
            }
        }
    }

    /// Take the pending event once.
    pub fn take_event(&mut self) -> Option<ButtonEvent> {
        self.pending.take()
    }

    /// Debounced pressed state.
    pub fn is_pressed(&self) -> bool {
        self.debouncer.is_pressed()
    }

    pub fn cfg(&self) -> &ButtonCfg {
        &self.cfg
    }
}
