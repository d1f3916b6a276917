//! Travel limit switches and the one-shot safety sweep.
//!
//! Hitting a limit starts a fixed-direction sweep towards the opposite limit.
//! The sweep only ends when the destination switch's debounced level reads
//! pressed; bounce on either switch cannot end it early.

use serde::Serialize;
use tracker_traits::LimitSwitches;

use crate::config::{AxisId, EndstopCfg};
use crate::debounce::Debouncer;
use crate::util::clamp_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SweepState {
    #[default]
    Idle,
    /// Triggered by limit A; driving towards B.
    LeavingA,
    /// Triggered by limit B; driving towards A.
    LeavingB,
}

#[derive(Debug, Clone)]
pub struct EndstopSweepGuard {
    cfg: EndstopCfg,
    limit_a: Debouncer,
    limit_b: Debouncer,
    state: SweepState,
}

impl EndstopSweepGuard {
    /// `initial_a` / `initial_b` are raw levels at boot. A switch already
    /// pressed at boot does not start a sweep.
    pub fn new(cfg: EndstopCfg, initial_a: bool, initial_b: bool) -> Self {
        let limit_a = Debouncer::new(cfg.debounce_ms, initial_a == cfg.active_high);
        let limit_b = Debouncer::new(cfg.debounce_ms, initial_b == cfg.active_high);
        Self {
            cfg,
            limit_a,
            limit_b,
            state: SweepState::Idle,
        }
    }

    /// Feed raw levels and advance the sweep state.
    pub fn tick(&mut self, now_ms: u64, raw_a: bool, raw_b: bool) -> SweepState {
        self.limit_a.update(raw_a == self.cfg.active_high, now_ms);
        self.limit_b.update(raw_b == self.cfg.active_high, now_ms);
        let rising_a = self.limit_a.take_rising_edge();
        let rising_b = self.limit_b.take_rising_edge();
        // Falling edges carry no meaning here.
        self.limit_a.take_falling_edge();
        self.limit_b.take_falling_edge();

        let next = match self.state {
            SweepState::Idle if rising_a => SweepState::LeavingA,
            SweepState::Idle if rising_b => SweepState::LeavingB,
            SweepState::LeavingA if self.limit_b.is_pressed() => SweepState::Idle,
            SweepState::LeavingB if self.limit_a.is_pressed() => SweepState::Idle,
            s => s,
        };

        if next != self.state {
            match next {
                SweepState::Idle => {
                    tracing::info!(from = ?self.state, axis = %self.cfg.axis, "sweep complete");
                }
                _ => tracing::info!(
                    state = ?next,
                    axis = %self.cfg.axis,
                    target = self.sweep_target_for(next),
                    "limit hit, sweep started"
                ),
            }
            self.state = next;
        }
        self.state
    }

    /// Read `switches` and advance. A failed read keeps the previous levels.
    pub fn poll<S: LimitSwitches + ?Sized>(&mut self, now_ms: u64, switches: &mut S) -> SweepState {
        let (raw_a, raw_b) = match switches.read_levels() {
            Ok(levels) => levels,
            Err(e) => {
                tracing::warn!(error = %e, "limit switch read failed, keeping last levels");
                let to_raw = |pressed: bool| pressed == self.cfg.active_high;
                (to_raw(self.limit_a.last_raw()), to_raw(self.limit_b.last_raw()))
            }
        };
        self.tick(now_ms, raw_a, raw_b)
    }

    fn sweep_target_for(&self, state: SweepState) -> f32 {
        let magnitude = clamp_unit(self.cfg.sweep_norm.abs());
        let dir = match state {
            SweepState::Idle => return 0.0,
            SweepState::LeavingA => self.cfg.dir_from_a,
            SweepState::LeavingB => self.cfg.dir_from_b,
        };
        if dir < 0 { -magnitude } else { magnitude }
    }

    /// Forced target while sweeping; `None` when idle.
    pub fn sweep_target(&self) -> Option<f32> {
        self.is_sweeping()
            .then(|| self.sweep_target_for(self.state))
    }

    pub fn is_sweeping(&self) -> bool {
        self.state != SweepState::Idle
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn affected_axis(&self) -> AxisId {
        self.cfg.axis
    }

    /// Debounced pressed levels of (A, B).
    pub fn limits_pressed(&self) -> (bool, bool) {
        (self.limit_a.is_pressed(), self.limit_b.is_pressed())
    }
}
