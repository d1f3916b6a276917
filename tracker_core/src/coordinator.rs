//! Shared motion block for both axes near zero error.
//!
//! When both offsets stay inside their deadbands for `hold_ms`, motion on
//! both axes is suppressed for `block_ms`. A block window that expires while
//! still in deadband is re-armed; leaving the deadband only unblocks once the
//! current window has run out. `HoldBlockState` carries those timers and is
//! also what a single axis uses for its own auto-block.

use crate::config::CoordinatorCfg;
use crate::util::abs_or_zero;

/// Hold-then-block timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoldBlockState {
    pub deadband_enter_ms: Option<u64>,
    pub block_until_ms: Option<u64>,
    pub blocked: bool,
}

impl HoldBlockState {
    /// Advance with whether the watched offsets are in deadband. Returns
    /// whether motion is blocked.
    pub fn advance(
        &mut self,
        now_ms: u64,
        in_deadband: bool,
        hold_ms: u64,
        block_ms: u64,
    ) -> bool {
        match self.block_until_ms {
            Some(until) if now_ms < until => {
                self.blocked = true;
            }
            Some(_) if in_deadband => {
                self.block_until_ms = Some(now_ms.saturating_add(block_ms));
                self.blocked = true;
            }
            _ if !in_deadband => {
                *self = Self::default();
            }
            _ => {
                let enter = *self.deadband_enter_ms.get_or_insert(now_ms);
                if now_ms.saturating_sub(enter) >= hold_ms {
                    self.block_until_ms = Some(now_ms.saturating_add(block_ms));
                    self.blocked = true;
                } else {
                    self.blocked = false;
                }
            }
        }
        self.blocked
    }
}

/// Timers owned by `DualAxisCoordinator`.
pub type CoordinatorState = HoldBlockState;

/// Phase derived from the timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    Unblocked,
    Holding,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct DualAxisCoordinator {
    cfg: CoordinatorCfg,
    enabled: bool,
    state: CoordinatorState,
}

impl DualAxisCoordinator {
    pub fn new(cfg: CoordinatorCfg) -> Self {
        let enabled = cfg.enabled;
        Self {
            cfg,
            enabled,
            state: CoordinatorState::default(),
        }
    }

    /// Enable or disable; any change resets the timers.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.reset();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reset(&mut self) {
        self.state = CoordinatorState::default();
    }

    /// Advance with the newest offsets (`None` = no sample yet). Returns the
    /// motor enable both axes should take, or `None` while disabled.
    pub fn tick(&mut self, now_ms: u64, diff_h: Option<f32>, diff_v: Option<f32>) -> Option<bool> {
        if !self.enabled {
            return None;
        }
        let (Some(h), Some(v)) = (diff_h, diff_v) else {
            self.reset();
            return Some(true);
        };

        let in_deadband = h.abs() <= abs_or_zero(self.cfg.deadband_h_pct)
            && v.abs() <= abs_or_zero(self.cfg.deadband_v_pct);
        let was_blocked = self.state.blocked;
        self.state
            .advance(now_ms, in_deadband, self.cfg.hold_ms, self.cfg.block_ms);

        if self.state.blocked != was_blocked {
            if self.state.blocked {
                tracing::info!(
                    diff_h = h,
                    diff_v = v,
                    block_ms = self.cfg.block_ms,
                    "coordinator block"
                );
            } else {
                tracing::info!(diff_h = h, diff_v = v, "coordinator unblock");
            }
        }

        Some(!self.state.blocked)
    }

    pub fn phase(&self) -> CoordinatorPhase {
        if self.state.blocked {
            CoordinatorPhase::Blocked
        } else if self.state.deadband_enter_ms.is_some() {
            CoordinatorPhase::Holding
        } else {
            CoordinatorPhase::Unblocked
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.state.blocked
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }
}
