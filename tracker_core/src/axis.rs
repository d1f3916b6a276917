//! One controllable axis: sensor, tracking logic and actuator behind a pair
//! of override inputs.
//!
//! With no enable override in force, an axis configured for auto-block holds
//! its own motor off once its offset has stayed inside the base deadband for
//! `hold_ms`, using the same hold/block timers as the coordinator.

use eyre::WrapErr;
use serde::Serialize;
use tracker_traits::{HBridge, LightPair};

use crate::actuator::{DutyPair, PwmActuator};
use crate::config::{AutoBlockCfg, AxisCfg, AxisId};
use crate::coordinator::HoldBlockState;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::sensor::{DifferentialLightSensor, LightSample};
use crate::tracking::AxisTrackingLogic;
use crate::util::clamp_norm;

/// Per-tick override inputs for one axis. `None` means "no opinion".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisOverrides {
    /// Replaces the computed target verbatim.
    pub target: Option<f32>,
    /// Forces the motor enable.
    pub enabled: Option<bool>,
}

impl AxisOverrides {
    pub const NONE: Self = Self {
        target: None,
        enabled: None,
    };

    pub fn resolve_target(&self, computed: f32) -> f32 {
        self.target.map_or(computed, clamp_norm)
    }

    pub fn resolve_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// One log line per processed sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisLogRecord {
    pub axis: AxisId,
    pub t_ms: u64,
    pub avg_a: u32,
    pub avg_b: u32,
    pub diff_percent: f32,
    pub target_norm: f32,
    pub applied_norm: f32,
    pub applied_raw: u32,
}

pub struct AxisUnit<L, B> {
    id: AxisId,
    sensor: DifferentialLightSensor,
    tracking: AxisTrackingLogic,
    actuator: PwmActuator,
    light: L,
    bridge: Option<B>,
    overrides: AxisOverrides,
    auto_block: AutoBlockCfg,
    auto_block_state: HoldBlockState,
    log_enabled: bool,
    pending_log: Option<AxisLogRecord>,
    read_failures: u64,
}

impl<L, B> core::fmt::Debug for AxisUnit<L, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AxisUnit")
            .field("id", &self.id)
            .field("has_bridge", &self.bridge.is_some())
            .field("overrides", &self.overrides)
            .field("auto_blocked", &self.auto_block_state.blocked)
            .field("applied_norm", &self.actuator.applied_norm())
            .field("read_failures", &self.read_failures)
            .finish()
    }
}

impl<L: LightPair, B: HBridge> AxisUnit<L, B> {
    /// `bridge == None` builds a tracking-only axis that never issues outputs.
    pub fn new(id: AxisId, cfg: AxisCfg, light: L, bridge: Option<B>) -> Self {
        let log_enabled = cfg.log;
        Self {
            id,
            sensor: DifferentialLightSensor::new(cfg.sensor),
            tracking: AxisTrackingLogic::new(cfg.tracking),
            actuator: PwmActuator::new(cfg.actuator),
            light,
            bridge,
            overrides: AxisOverrides::NONE,
            auto_block: cfg.auto_block,
            auto_block_state: HoldBlockState::default(),
            log_enabled,
            pending_log: None,
            read_failures: 0,
        }
    }

    /// Sample the light pair and evaluate any completed window.
    /// Returns the sample that was processed this tick, if any.
    pub fn sense(&mut self, now_ms: u64) -> Option<LightSample> {
        match self.sensor.sample(now_ms, &mut self.light) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                self.read_failures += 1;
                tracing::warn!(axis = %self.id, error = %e, "light read failed, reading discarded");
                return None;
            }
        }
        let sample = self.sensor.consume()?;
        self.process(now_ms, sample);
        Some(sample)
    }

    /// Evaluate a sample obtained elsewhere (trace replay).
    pub fn sense_with(&mut self, now_ms: u64, a: u32, b: u32) -> Option<LightSample> {
        if !self.sensor.push(now_ms, a, b) {
            return None;
        }
        let sample = self.sensor.consume()?;
        self.process(now_ms, sample);
        Some(sample)
    }

    fn process(&mut self, now_ms: u64, sample: LightSample) {
        let command = self.tracking.evaluate(sample);
        if self.log_enabled {
            self.pending_log = Some(AxisLogRecord {
                axis: self.id,
                t_ms: now_ms,
                avg_a: sample.avg_a,
                avg_b: sample.avg_b,
                diff_percent: sample.diff_percent,
                target_norm: command.target_norm,
                applied_norm: self.actuator.applied_norm(),
                applied_raw: self.actuator.applied_raw(),
            });
        }
    }

    /// Standing overrides applied on the next `drive`.
    pub fn set_overrides(&mut self, overrides: AxisOverrides) {
        self.overrides = overrides;
    }

    pub fn overrides(&self) -> AxisOverrides {
        self.overrides
    }

    /// Apply overrides, tick the actuator and write the bridge on update.
    pub fn drive(&mut self, now_ms: u64) -> Result<Option<DutyPair>> {
        self.apply_overrides(now_ms);
        let updated = self.actuator.tick(now_ms);
        if let Some(record) = self.pending_log.as_mut() {
            record.applied_norm = self.actuator.applied_norm();
            record.applied_raw = self.actuator.applied_raw();
        }
        match updated {
            Some(duty) => {
                self.write(duty)?;
                Ok(Some(duty))
            }
            None => Ok(None),
        }
    }

    /// `sense` then `drive`.
    pub fn tick(&mut self, now_ms: u64) -> Result<Option<DutyPair>> {
        self.sense(now_ms);
        self.drive(now_ms)
    }

    /// Disable and write a zero duty immediately.
    pub fn stop(&mut self, now_ms: u64) -> Result<DutyPair> {
        self.actuator.set_enabled(false);
        let duty = self.actuator.flush(now_ms);
        self.write(duty)?;
        Ok(duty)
    }

    /// Apply overrides and update regardless of the period gate.
    pub fn flush(&mut self, now_ms: u64) -> Result<DutyPair> {
        self.apply_overrides(now_ms);
        let duty = self.actuator.flush(now_ms);
        self.write(duty)?;
        Ok(duty)
    }

    fn apply_overrides(&mut self, now_ms: u64) {
        let computed = self.tracking.last_command().target_norm;
        self.actuator
            .set_target(self.overrides.resolve_target(computed));
        let enabled = match self.overrides.enabled {
            Some(enabled) => {
                self.auto_block_state = HoldBlockState::default();
                enabled
            }
            None if self.auto_block.enabled => !self.auto_block_tick(now_ms),
            None => true,
        };
        self.actuator.set_enabled(enabled);
    }

    /// Advance the auto-block timers; true while blocked. No sample yet
    /// never blocks.
    fn auto_block_tick(&mut self, now_ms: u64) -> bool {
        let Some(diff) = self.last_diff_percent() else {
            return false;
        };
        let in_deadband = diff.abs() <= self.tracking.base_deadband();
        let was_blocked = self.auto_block_state.blocked;
        let blocked = self.auto_block_state.advance(
            now_ms,
            in_deadband,
            self.auto_block.hold_ms,
            self.auto_block.block_ms,
        );
        if blocked != was_blocked {
            tracing::debug!(axis = %self.id, blocked, diff_pct = diff, t_ms = now_ms, "auto-block");
        }
        blocked
    }

    /// Turn auto-block on or off; turning it off clears its timers.
    pub fn set_auto_block_enabled(&mut self, enabled: bool) {
        self.auto_block.enabled = enabled;
        if !enabled {
            self.auto_block_state = HoldBlockState::default();
        }
    }

    pub fn is_auto_blocked(&self) -> bool {
        self.auto_block_state.blocked
    }

    fn write(&mut self, duty: DutyPair) -> Result<()> {
        let Some(bridge) = self.bridge.as_mut() else {
            return Ok(());
        };
        bridge
            .write(duty.in1, duty.in2)
            .map_err(|e| {
                let err = map_hw_error(&*e);
                tracing::warn!(axis = %self.id, error = %err, "bridge write failed");
                eyre::Report::new(err)
            })
            .wrap_err_with(|| format!("axis {} bridge write", self.id))
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn id(&self) -> AxisId {
        self.id
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn has_diff_sample(&self) -> bool {
        self.sensor.latest().is_some()
    }

    /// Newest differential offset, if any window completed.
    pub fn last_diff_percent(&self) -> Option<f32> {
        self.sensor.latest().map(|s| s.diff_percent)
    }

    pub fn last_sample(&self) -> Option<&LightSample> {
        self.sensor.latest()
    }

    pub fn last_effective_deadband(&self) -> f32 {
        self.tracking.last_effective_deadband()
    }

    pub fn base_deadband(&self) -> f32 {
        self.tracking.base_deadband()
    }

    pub fn pwm_threshold(&self) -> f32 {
        self.tracking.pwm_threshold()
    }

    pub fn computed_target(&self) -> f32 {
        self.tracking.last_command().target_norm
    }

    pub fn is_motor_enabled(&self) -> bool {
        self.actuator.is_enabled()
    }

    pub fn applied_norm(&self) -> f32 {
        self.actuator.applied_norm()
    }

    pub fn applied_raw(&self) -> u32 {
        self.actuator.applied_raw()
    }

    pub fn duty(&self) -> DutyPair {
        self.actuator.duty()
    }

    pub fn actuator(&self) -> &PwmActuator {
        &self.actuator
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Whether a sample was processed since the last call.
    pub fn take_new_sample(&mut self) -> bool {
        self.tracking.take_new_sample()
    }

    /// Log record for the newest processed sample, once.
    pub fn consume_log(&mut self) -> Option<AxisLogRecord> {
        self.pending_log.take()
    }

    pub fn light_mut(&mut self) -> &mut L {
        &mut self.light
    }
}
