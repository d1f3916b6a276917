//! Top-level mode supervisor.
//!
//! Owns both axes, the coordinator, the endstop guard and the optional
//! environment sampler and display. Each tick it resolves one set of overrides
//! per axis from (highest priority first): an active sweep on the affected
//! axis, a pending sleep entry, then the current mode.

use serde::Serialize;
use tracker_traits::{EnvironmentSensor, HBridge, LightPair, LimitSwitches, WakeCause};

use crate::axis::{AxisLogRecord, AxisOverrides, AxisUnit};
use crate::button::ButtonEvent;
use crate::config::{AxisId, SupervisorCfg};
use crate::coordinator::DualAxisCoordinator;
use crate::display::{AxisView, DisplayFrame, DisplaySink};
use crate::endstop::{EndstopSweepGuard, SweepState};
use crate::environment::{EnvironmentSample, EnvironmentSampler};
use crate::error::Result;
use crate::util::period_due;

/// Boxed axis as held by the supervisor.
pub type DynAxis = AxisUnit<Box<dyn LightPair>, Box<dyn HBridge>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemMode {
    /// Automatic tracking under the coordinator.
    Active,
    /// Tracking computed but both motors held off.
    ActiveBlocked,
    /// Low-power cycle; tracks without coordinator between sleeps.
    Sleep,
}

impl SystemMode {
    /// Mode a boot or wake-up starts in.
    pub fn from_wake_cause(cause: WakeCause) -> Self {
        match cause {
            WakeCause::Timer => SystemMode::Sleep,
            WakeCause::External | WakeCause::PowerOn => SystemMode::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SleepRequest {
    pub wake_after_ms: u64,
    pub wake_on_touch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// Motors are stopped; the caller should hand off to the power manager.
    SleepReady(SleepRequest),
}

/// Resolve the overrides for one axis.
///
/// `sweep` is the guard's affected axis and forced target while sweeping;
/// `coordinator` is the coordinator's enable decision (`None` when it is off).
pub fn compose_overrides(
    axis: AxisId,
    sweep: Option<(AxisId, f32)>,
    sleep_pending: bool,
    mode: SystemMode,
    coordinator: Option<bool>,
) -> AxisOverrides {
    if let Some((sweep_axis, target)) = sweep
        && sweep_axis == axis
    {
        return AxisOverrides {
            target: Some(target),
            enabled: Some(true),
        };
    }
    if sleep_pending {
        return AxisOverrides {
            target: None,
            enabled: Some(false),
        };
    }
    match mode {
        SystemMode::ActiveBlocked => AxisOverrides {
            target: None,
            enabled: Some(false),
        },
        SystemMode::Active => AxisOverrides {
            target: None,
            enabled: coordinator,
        },
        SystemMode::Sleep => AxisOverrides::NONE,
    }
}

pub struct ModeSupervisor {
    cfg: SupervisorCfg,
    mode: SystemMode,
    axis_h: DynAxis,
    axis_v: DynAxis,
    coordinator: DualAxisCoordinator,
    guard: EndstopSweepGuard,
    limits: Box<dyn LimitSwitches>,
    environment: Option<(EnvironmentSampler, Box<dyn EnvironmentSensor>)>,
    display: Option<Box<dyn DisplaySink>>,
    coordinator_decision: Option<bool>,
    sleep_pending: bool,
    sleep_hold_start_ms: Option<u64>,
    last_display_ms: Option<u64>,
}

impl core::fmt::Debug for ModeSupervisor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModeSupervisor")
            .field("mode", &self.mode)
            .field("sleep_pending", &self.sleep_pending)
            .field("sweep", &self.guard.state())
            .field("coordinator", &self.coordinator.phase())
            .field("axis_h", &self.axis_h)
            .field("axis_v", &self.axis_v)
            .finish()
    }
}

impl ModeSupervisor {
    pub(crate) fn from_parts(
        cfg: SupervisorCfg,
        axis_h: DynAxis,
        axis_v: DynAxis,
        guard: EndstopSweepGuard,
        limits: Box<dyn LimitSwitches>,
        environment: Option<(EnvironmentSampler, Box<dyn EnvironmentSensor>)>,
        display: Option<Box<dyn DisplaySink>>,
    ) -> Self {
        let coordinator = DualAxisCoordinator::new(cfg.coordinator.clone());
        let mut sup = Self {
            cfg,
            mode: SystemMode::Active,
            axis_h,
            axis_v,
            coordinator,
            guard,
            limits,
            environment,
            display,
            coordinator_decision: None,
            sleep_pending: false,
            sleep_hold_start_ms: None,
            last_display_ms: None,
        };
        sup.apply_mode(SystemMode::Active);
        sup
    }

    // ── Mode handling ────────────────────────────────────────────────────────

    fn apply_mode(&mut self, mode: SystemMode) {
        self.mode = mode;
        self.coordinator
            .set_enabled(mode == SystemMode::Active && self.cfg.coordinator.enabled);
        self.coordinator.reset();
        self.coordinator_decision = None;
        self.sleep_hold_start_ms = None;
        if mode != SystemMode::Sleep {
            self.sleep_pending = false;
        }
    }

    fn switch_mode(&mut self, mode: SystemMode, now_ms: u64) {
        if mode != self.mode {
            tracing::info!(from = ?self.mode, to = ?mode, t_ms = now_ms, "mode change");
        }
        self.apply_mode(mode);
    }

    fn request_sleep(&mut self, now_ms: u64) {
        self.switch_mode(SystemMode::Sleep, now_ms);
        self.sleep_pending = true;
        tracing::info!(
            t_ms = now_ms,
            sweeping = self.guard.is_sweeping(),
            "sleep entry requested"
        );
    }

    /// Apply a button event.
    pub fn handle_button(&mut self, event: ButtonEvent, now_ms: u64) {
        match event {
            ButtonEvent::LongPress => self.request_sleep(now_ms),
            ButtonEvent::ShortPress => {
                let next = match self.mode {
                    SystemMode::Active => SystemMode::ActiveBlocked,
                    SystemMode::ActiveBlocked | SystemMode::Sleep => SystemMode::Active,
                };
                self.switch_mode(next, now_ms);
            }
        }
    }

    /// Re-enter after boot or a low-power period.
    pub fn resume(&mut self, cause: WakeCause, now_ms: u64) {
        let mode = SystemMode::from_wake_cause(cause);
        tracing::info!(?cause, mode = ?mode, t_ms = now_ms, "wake");
        self.apply_mode(mode);
        self.sleep_pending = false;
    }

    // ── Tick ─────────────────────────────────────────────────────────────────

    pub fn tick(&mut self, now_ms: u64) -> Result<TickOutcome> {
        self.guard.poll(now_ms, &mut self.limits);

        self.axis_h.sense(now_ms);
        self.axis_v.sense(now_ms);

        self.coordinator_decision = self.coordinator.tick(
            now_ms,
            self.axis_h.last_diff_percent(),
            self.axis_v.last_diff_percent(),
        );

        self.update_sleep_hold(now_ms);

        let sweep = self
            .guard
            .sweep_target()
            .map(|target| (self.guard.affected_axis(), target));
        for id in [AxisId::H, AxisId::V] {
            let overrides = compose_overrides(
                id,
                sweep,
                self.sleep_pending,
                self.mode,
                self.coordinator_decision,
            );
            self.axis_mut(id).set_overrides(overrides);
        }

        let outcome = if self.sleep_pending && !self.guard.is_sweeping() {
            self.commit_sleep(now_ms)?
        } else {
            self.axis_h.drive(now_ms)?;
            self.axis_v.drive(now_ms)?;
            TickOutcome::Running
        };

        if let Some((sampler, sensor)) = self.environment.as_mut() {
            sampler.sample(now_ms, sensor);
        }

        self.push_display(now_ms);
        Ok(outcome)
    }

    fn update_sleep_hold(&mut self, now_ms: u64) {
        let eligible = !self.sleep_pending
            && match self.mode {
                SystemMode::Active => self.cfg.sleep.auto_from_active,
                SystemMode::Sleep => true,
                SystemMode::ActiveBlocked => false,
            };
        if !eligible {
            self.sleep_hold_start_ms = None;
            return;
        }

        let settled = |axis: &DynAxis| {
            axis.last_diff_percent()
                .is_some_and(|d| d.abs() <= axis.last_effective_deadband())
        };
        if !(settled(&self.axis_h) && settled(&self.axis_v)) {
            self.sleep_hold_start_ms = None;
            return;
        }

        let start = *self.sleep_hold_start_ms.get_or_insert(now_ms);
        if now_ms.saturating_sub(start) >= self.cfg.sleep.hold_ms {
            tracing::info!(
                held_ms = now_ms.saturating_sub(start),
                "both axes settled, going to sleep"
            );
            self.request_sleep(now_ms);
        }
    }

    fn commit_sleep(&mut self, now_ms: u64) -> Result<TickOutcome> {
        self.axis_h.stop(now_ms)?;
        self.axis_v.stop(now_ms)?;
        self.sleep_pending = false;
        self.sleep_hold_start_ms = None;
        let request = SleepRequest {
            wake_after_ms: self.cfg.sleep.wake_interval_ms,
            wake_on_touch: self.cfg.sleep.wake_on_touch,
        };
        tracing::info!(
            wake_after_ms = request.wake_after_ms,
            wake_on_touch = request.wake_on_touch,
            "motors stopped, ready to sleep"
        );
        Ok(TickOutcome::SleepReady(request))
    }

    fn push_display(&mut self, now_ms: u64) {
        if self.display.is_none()
            || !period_due(self.last_display_ms, now_ms, self.cfg.display_refresh_ms)
        {
            return;
        }
        self.last_display_ms = Some(now_ms);
        let frame = self.display_frame(now_ms);
        if let Some(display) = self.display.as_mut()
            && let Err(e) = display.push(&frame)
        {
            tracing::warn!(error = %e, "display push failed");
        }
    }

    /// Best-effort: stop both motors, returning the first error.
    pub fn stop_all(&mut self, now_ms: u64) -> Result<()> {
        let h = self.axis_h.stop(now_ms);
        let v = self.axis_v.stop(now_ms);
        h?;
        v?;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn mode(&self) -> SystemMode {
        self.mode
    }

    pub fn is_sleep_pending(&self) -> bool {
        self.sleep_pending
    }

    pub fn axis(&self, id: AxisId) -> &DynAxis {
        match id {
            AxisId::H => &self.axis_h,
            AxisId::V => &self.axis_v,
        }
    }

    pub fn axis_mut(&mut self, id: AxisId) -> &mut DynAxis {
        match id {
            AxisId::H => &mut self.axis_h,
            AxisId::V => &mut self.axis_v,
        }
    }

    pub fn coordinator(&self) -> &DualAxisCoordinator {
        &self.coordinator
    }

    pub fn guard(&self) -> &EndstopSweepGuard {
        &self.guard
    }

    pub fn sweep_state(&self) -> SweepState {
        self.guard.state()
    }

    pub fn environment(&self) -> Option<&EnvironmentSample> {
        self.environment.as_ref().and_then(|(s, _)| s.latest())
    }

    /// New environment report, once.
    pub fn consume_environment(&mut self) -> Option<EnvironmentSample> {
        self.environment.as_mut().and_then(|(s, _)| s.consume())
    }

    /// Axis log records produced since the last call, H first.
    pub fn consume_logs(&mut self) -> Vec<AxisLogRecord> {
        [self.axis_h.consume_log(), self.axis_v.consume_log()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn display_frame(&self, now_ms: u64) -> DisplayFrame {
        let view = |axis: &DynAxis| AxisView {
            diff_percent: axis.last_diff_percent(),
            effective_deadband: axis.last_effective_deadband(),
            applied_norm: axis.applied_norm(),
            motor_enabled: axis.is_motor_enabled(),
        };
        DisplayFrame {
            t_ms: now_ms,
            mode: self.mode,
            h: view(&self.axis_h),
            v: view(&self.axis_v),
            pwm_threshold_pct: self.axis_h.pwm_threshold(),
            coordinator_blocked: self.coordinator.is_blocked(),
            sweep: self.guard.state(),
            environment: self.environment().copied(),
        }
    }

    pub fn cfg(&self) -> &SupervisorCfg {
        &self.cfg
    }
}
