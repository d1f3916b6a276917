//! Type-state builder for `ModeSupervisor`.
//!
//! The builder enforces at compile time that both axes and the limit switches
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;

use eyre::WrapErr;
use tracker_traits::{EnvironmentSensor, HBridge, LightPair, LimitSwitches};

use crate::axis::AxisUnit;
use crate::config::{AxisCfg, AxisId, EnvironmentCfg, SupervisorCfg};
use crate::display::DisplaySink;
use crate::endstop::EndstopSweepGuard;
use crate::environment::EnvironmentSampler;
use crate::error::{BuildError, Result};
use crate::hw_error::map_hw_error;
use crate::supervisor::{DynAxis, ModeSupervisor};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

struct AxisParts {
    cfg: AxisCfg,
    light: Box<dyn LightPair>,
    bridge: Option<Box<dyn HBridge>>,
}

/// Builder for `ModeSupervisor`. All fields are validated on `build()`.
pub struct TrackerBuilder<H, V, L> {
    cfg: Option<SupervisorCfg>,
    axis_h: Option<AxisParts>,
    axis_v: Option<AxisParts>,
    limits: Option<Box<dyn LimitSwitches>>,
    environment: Option<(EnvironmentCfg, Box<dyn EnvironmentSensor>)>,
    display: Option<Box<dyn DisplaySink>>,
    _h: PhantomData<H>,
    _v: PhantomData<V>,
    _l: PhantomData<L>,
}

impl Default for TrackerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            cfg: None,
            axis_h: None,
            axis_v: None,
            limits: None,
            environment: None,
            display: None,
            _h: PhantomData,
            _v: PhantomData,
            _l: PhantomData,
        }
    }
}

impl ModeSupervisor {
    /// Start building a supervisor.
    pub fn builder() -> TrackerBuilder<Missing, Missing, Missing> {
        TrackerBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate_axis(cfg: &AxisCfg) -> Result<()> {
    let t = &cfg.tracking;
    if !t.deadband_pct.is_finite() || t.deadband_pct < 0.0 {
        return Err(invalid("deadband_pct must be finite and >= 0"));
    }
    if !t.pwm_threshold_pct.is_finite() {
        return Err(invalid("pwm_threshold_pct must be finite"));
    }
    if !(0.0..=1.0).contains(&t.pwm_min_norm) || !(0.0..=1.0).contains(&t.pwm_max_norm) {
        return Err(invalid("pwm_min_norm/pwm_max_norm must be in [0, 1]"));
    }
    if t.low_light.len() > 3 {
        return Err(invalid("at most three low-light levels"));
    }
    if !(1..=16).contains(&cfg.actuator.pwm_res_bits) {
        return Err(invalid("pwm_res_bits must be in 1..=16"));
    }
    if cfg.auto_block.enabled && cfg.auto_block.block_ms == 0 {
        return Err(invalid("auto_block block_ms must be >= 1"));
    }
    Ok(())
}

/// Validate configuration and assemble the supervisor.
fn validate_and_build(
    cfg: SupervisorCfg,
    h: AxisParts,
    v: AxisParts,
    mut limits: Box<dyn LimitSwitches>,
    environment: Option<(EnvironmentCfg, Box<dyn EnvironmentSensor>)>,
    display: Option<Box<dyn DisplaySink>>,
) -> Result<ModeSupervisor> {
    // ── Validation ───────────────────────────────────────────────────────────
    validate_axis(&h.cfg)?;
    validate_axis(&v.cfg)?;
    let e = &cfg.endstop;
    if e.dir_from_a.abs() != 1 || e.dir_from_b.abs() != 1 || e.dir_from_a == e.dir_from_b {
        return Err(invalid("sweep directions must be opposite and +/-1"));
    }
    if !(e.sweep_norm.is_finite() && e.sweep_norm > 0.0 && e.sweep_norm <= 1.0) {
        return Err(invalid("sweep_norm must be in (0, 1]"));
    }
    if cfg.coordinator.block_ms == 0 {
        return Err(invalid("block_ms must be >= 1"));
    }
    if let Some((env, _)) = environment.as_ref()
        && env.samples == 0
    {
        return Err(invalid("environment samples must be >= 1"));
    }

    // ── Construction ─────────────────────────────────────────────────────────
    let (level_a, level_b) = limits
        .read_levels()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading limit switches at boot")?;
    let guard = EndstopSweepGuard::new(cfg.endstop.clone(), level_a, level_b);
    if guard.limits_pressed() != (false, false) {
        tracing::warn!(
            pressed = ?guard.limits_pressed(),
            "limit switch already closed at boot, no sweep until it reopens"
        );
    }

    let axis = |id, parts: AxisParts| -> DynAxis {
        AxisUnit::new(id, parts.cfg, parts.light, parts.bridge)
    };
    let axis_h = axis(AxisId::H, h);
    let axis_v = axis(AxisId::V, v);
    let has_environment = environment.is_some();
    let has_display = display.is_some();
    tracing::info!(
        h_bridge = axis_h.has_bridge(),
        v_bridge = axis_v.has_bridge(),
        has_environment,
        has_display,
        "tracker assembled"
    );

    let environment =
        environment.map(|(env_cfg, sensor)| (EnvironmentSampler::new(&env_cfg), sensor));

    Ok(ModeSupervisor::from_parts(
        cfg,
        axis_h,
        axis_v,
        guard,
        limits,
        environment,
        display,
    ))
}

impl<H, V, L> TrackerBuilder<H, V, L> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<ModeSupervisor> {
        let h = self
            .axis_h
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAxisH))?;
        let v = self
            .axis_v
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAxisV))?;
        let limits = self
            .limits
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLimits))?;
        validate_and_build(
            self.cfg.unwrap_or_default(),
            h,
            v,
            limits,
            self.environment,
            self.display,
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<H, V, L> TrackerBuilder<H, V, L> {
    pub fn with_config(mut self, cfg: SupervisorCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_environment(
        mut self,
        cfg: EnvironmentCfg,
        sensor: impl EnvironmentSensor + 'static,
    ) -> Self {
        self.environment = Some((cfg, Box::new(sensor)));
        self
    }

    pub fn with_display(mut self, display: impl DisplaySink + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }
}

// Setters that advance type-state

impl<V, L> TrackerBuilder<Missing, V, L> {
    /// Horizontal axis. `bridge == None` tracks without ever driving.
    pub fn with_axis_h(
        self,
        cfg: AxisCfg,
        light: impl LightPair + 'static,
        bridge: Option<Box<dyn HBridge>>,
    ) -> TrackerBuilder<Set, V, L> {
        TrackerBuilder {
            cfg: self.cfg,
            axis_h: Some(AxisParts {
                cfg,
                light: Box::new(light),
                bridge,
            }),
            axis_v: self.axis_v,
            limits: self.limits,
            environment: self.environment,
            display: self.display,
            _h: PhantomData,
            _v: PhantomData,
            _l: PhantomData,
        }
    }
}

impl<H, L> TrackerBuilder<H, Missing, L> {
    /// Vertical axis. `bridge == None` tracks without ever driving.
    pub fn with_axis_v(
        self,
        cfg: AxisCfg,
        light: impl LightPair + 'static,
        bridge: Option<Box<dyn HBridge>>,
    ) -> TrackerBuilder<H, Set, L> {
        TrackerBuilder {
            cfg: self.cfg,
            axis_h: self.axis_h,
            axis_v: Some(AxisParts {
                cfg,
                light: Box::new(light),
                bridge,
            }),
            limits: self.limits,
            environment: self.environment,
            display: self.display,
            _h: PhantomData,
            _v: PhantomData,
            _l: PhantomData,
        }
    }
}

impl<H, V> TrackerBuilder<H, V, Missing> {
    pub fn with_limits(self, limits: impl LimitSwitches + 'static) -> TrackerBuilder<H, V, Set> {
        TrackerBuilder {
            cfg: self.cfg,
            axis_h: self.axis_h,
            axis_v: self.axis_v,
            limits: Some(Box::new(limits)),
            environment: self.environment,
            display: self.display,
            _h: PhantomData,
            _v: PhantomData,
            _l: PhantomData,
        }
    }
}

impl TrackerBuilder<Set, Set, Set> {
    /// Validate and build. Only available when both axes and the limits are set.
    pub fn build(self) -> Result<ModeSupervisor> {
        self.try_build()
    }
}
