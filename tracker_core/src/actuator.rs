//! Smoothed, kick-assisted PWM output for one H-bridge.

use serde::Serialize;

use crate::config::ActuatorCfg;
use crate::util::{clamp_norm, clamp_unit, period_due, pwm_range, quantize_duty, sign_of};

/// Raw duty for the two bridge inputs. At most one is nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DutyPair {
    pub in1: u32,
    pub in2: u32,
}

impl DutyPair {
    pub const STOP: Self = Self { in1: 0, in2: 0 };

    pub fn is_stopped(&self) -> bool {
        self.in1 == 0 && self.in2 == 0
    }
}

/// Output state owned by the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActuatorState {
    pub target_norm: f32,
    /// Exponential filter state; persists across updates and is frozen while
    /// the output is disabled.
    pub filtered_norm: f32,
    pub applied_norm: f32,
    pub kick_active_until: Option<u64>,
    pub last_sign: i8,
}

#[derive(Debug, Clone)]
pub struct PwmActuator {
    cfg: ActuatorCfg,
    range: u32,
    smooth: f32,
    kick_norm: f32,
    state: ActuatorState,
    enabled: bool,
    kick_pending: bool,
    last_update_ms: Option<u64>,
    applied_raw: u32,
    duty: DutyPair,
}

impl PwmActuator {
    pub fn new(cfg: ActuatorCfg) -> Self {
        let range = pwm_range(cfg.pwm_res_bits);
        let smooth = clamp_unit(cfg.smooth);
        let kick_norm = clamp_unit(cfg.kick_norm);
        Self {
            cfg,
            range,
            smooth,
            kick_norm,
            state: ActuatorState::default(),
            enabled: true,
            kick_pending: false,
            last_update_ms: None,
            applied_raw: 0,
            duty: DutyPair::STOP,
        }
    }

    /// Full-scale raw duty.
    pub fn range(&self) -> u32 {
        self.range
    }

    /// Set the signed normalized target. A reversal, or a start from a zero
    /// target, arms the kick; a zero target disarms it.
    pub fn set_target(&mut self, target_norm: f32) {
        let target = clamp_norm(target_norm);
        let sign = sign_of(target);
        if sign == 0 {
            self.kick_pending = false;
            self.state.kick_active_until = None;
        } else if sign != self.state.last_sign {
            self.kick_pending = true;
            self.state.kick_active_until = None;
        }
        self.state.last_sign = sign;
        self.state.target_norm = target;
    }

    /// Gate the output. While disabled both channels are zero and the filter
    /// is frozen; re-enabling with a nonzero target starts from standstill.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            if self.state.target_norm != 0.0 {
                self.kick_pending = true;
            }
        } else {
            self.state.kick_active_until = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Update if `update_ms` elapsed since the last update. Returns the new
    /// duty pair when an update ran.
    pub fn tick(&mut self, now_ms: u64) -> Option<DutyPair> {
        if !period_due(self.last_update_ms, now_ms, self.cfg.update_ms) {
            return None;
        }
        Some(self.update(now_ms))
    }

    /// Update regardless of the period gate.
    pub fn flush(&mut self, now_ms: u64) -> DutyPair {
        self.update(now_ms)
    }

    fn update(&mut self, now_ms: u64) -> DutyPair {
        self.last_update_ms = Some(now_ms);

        if !self.enabled {
            self.state.applied_norm = 0.0;
            return self.emit(0.0);
        }

        let target = self.state.target_norm;
        let alpha = 1.0 - self.smooth;
        self.state.filtered_norm =
            clamp_norm(self.state.filtered_norm + (target - self.state.filtered_norm) * alpha);

        if self.kick_pending && target != 0.0 {
            self.kick_pending = false;
            if self.cfg.kick_ms > 0 && self.kick_norm > 0.0 {
                self.state.kick_active_until = Some(now_ms.saturating_add(self.cfg.kick_ms));
            }
        }

        let kicking = target != 0.0
            && self
                .state
                .kick_active_until
                .is_some_and(|deadline| now_ms < deadline);
        let applied = if kicking {
            let magnitude = self.kick_norm.max(self.state.filtered_norm.abs());
            if target > 0.0 { magnitude } else { -magnitude }
        } else {
            self.state.kick_active_until = None;
            self.state.filtered_norm
        };

        self.state.applied_norm = clamp_norm(applied);
        self.emit(self.state.applied_norm)
    }

    fn emit(&mut self, applied: f32) -> DutyPair {
        let raw = quantize_duty(applied.abs(), self.range);
        self.applied_raw = raw;
        self.duty = if applied > 0.0 {
            DutyPair { in1: raw, in2: 0 }
        } else if applied < 0.0 {
            DutyPair { in1: 0, in2: raw }
        } else {
            DutyPair::STOP
        };
        tracing::trace!(
            applied_norm = applied,
            in1 = self.duty.in1,
            in2 = self.duty.in2,
            "actuator update"
        );
        self.duty
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn target_norm(&self) -> f32 {
        self.state.target_norm
    }

    pub fn filtered_norm(&self) -> f32 {
        self.state.filtered_norm
    }

    pub fn applied_norm(&self) -> f32 {
        self.state.applied_norm
    }

    pub fn applied_raw(&self) -> u32 {
        self.applied_raw
    }

    /// Last emitted duty pair.
    pub fn duty(&self) -> DutyPair {
        self.duty
    }

    pub fn is_kicking(&self, now_ms: u64) -> bool {
        self.state
            .kick_active_until
            .is_some_and(|deadline| now_ms < deadline)
    }
}
