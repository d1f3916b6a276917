//! Simulation, replay and self-check drivers around the control runner.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use serde::Serialize;
use tracker_config::Config;
use tracker_core::error::{Result, TrackerError};
use tracker_core::runner::run;
use tracker_core::{
    AxisCfg, AxisId, AxisLogRecord, ButtonCfg, DisplayFrame, DisplaySink, EnvironmentCfg,
    EnvironmentSample, ModeSupervisor, RunParams, RunSummary, SupervisorCfg, TouchButton,
};
use tracker_hardware::{
    FixedLimits, PlantAxis, PlantParams, RecordingBridge, ReplayLightPair, ScriptedButton,
    SimEnvironment, SimPlant, SimPower,
};
use tracker_traits::clock::test_clock::TestClock;
use tracker_traits::{HBridge, HwResult, LightPair, LimitSwitches, WakeCause};

use crate::cli::Press;

/// Simulated sensor readings when `[environment].pin` is set.
const SIM_TEMPERATURE_C: f32 = 22.0;
const SIM_HUMIDITY_PCT: f32 = 45.0;

/// Ticks the self-check runs against the simulated plant.
const SELF_CHECK_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub duration_ms: u64,
    pub plant: PlantParams,
    pub presses: Vec<Press>,
    pub boot_cause: WakeCause,
    pub wake_cause: WakeCause,
    pub max_sleeps: Option<u32>,
    pub fail_bridge_at: Option<u64>,
    pub jsonl: bool,
}

/// One stdout line in `--jsonl` mode.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonLine<'a> {
    Axis(&'a AxisLogRecord),
    Environment {
        t_ms: u64,
        #[serde(flatten)]
        sample: EnvironmentSample,
    },
    Summary {
        command: &'static str,
        #[serde(flatten)]
        summary: &'a RunSummary,
        axes: Vec<AxisReport>,
    },
}

#[derive(Debug, Clone, Serialize)]
struct AxisReport {
    axis: AxisId,
    has_bridge: bool,
    applied_norm: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    angle_deg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sun_deg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bridge_writes: Option<usize>,
}

/// Status frames go to the log; there is no panel in simulation.
struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn push(&mut self, frame: &DisplayFrame) -> HwResult<()> {
        tracing::debug!(
            t_ms = frame.t_ms,
            mode = ?frame.mode,
            h_diff_pct = ?frame.h.diff_percent,
            v_diff_pct = ?frame.v.diff_percent,
            h_applied = frame.h.applied_norm,
            v_applied = frame.v.applied_norm,
            blocked = frame.coordinator_blocked,
            sweep = ?frame.sweep,
            "display"
        );
        Ok(())
    }
}

fn plant_axis(id: AxisId) -> PlantAxis {
    match id {
        AxisId::H => PlantAxis::H,
        AxisId::V => PlantAxis::V,
    }
}

/// Full-scale raw duty for the configured resolution.
fn pwm_range(bits: u8) -> u32 {
    (1u32 << u32::from(bits.clamp(1, 16))) - 1
}

/// Wire the configured supervisor around the given devices.
fn build_supervisor(
    cfg: &Config,
    lights: (impl LightPair + 'static, impl LightPair + 'static),
    bridges: (Option<Box<dyn HBridge>>, Option<Box<dyn HBridge>>),
    limits: impl LimitSwitches + 'static,
) -> Result<ModeSupervisor> {
    let mut builder = ModeSupervisor::builder()
        .with_config(SupervisorCfg::from(cfg))
        .with_axis_h(
            AxisCfg::from_section(AxisId::H, &cfg.axis_h),
            lights.0,
            bridges.0,
        )
        .with_axis_v(
            AxisCfg::from_section(AxisId::V, &cfg.axis_v),
            lights.1,
            bridges.1,
        )
        .with_limits(limits)
        .with_display(LogDisplay);
    if let Some(pin) = cfg.environment.pin {
        tracing::debug!(pin, "environment sensor enabled");
        builder = builder.with_environment(
            EnvironmentCfg::from(&cfg.environment),
            SimEnvironment::new(SIM_TEMPERATURE_C, SIM_HUMIDITY_PCT),
        );
    }
    builder.build().wrap_err("building tracker")
}

fn run_params(cfg: &Config, duration_ms: u64, max_sleeps: Option<u32>) -> RunParams {
    let tick_ms = cfg.runner.tick_ms.max(1);
    RunParams {
        tick_ms,
        max_ticks: Some(duration_ms / tick_ms),
        max_sleeps,
        release_wait_ms: cfg.button.release_wait_ms,
    }
}

/// Drains per-tick records into JSON lines on stdout or into the log.
struct RecordSink<W: Write> {
    out: Option<W>,
    log_environment: bool,
}

impl<W: Write> RecordSink<W> {
    fn line(&mut self, line: &JsonLine<'_>) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        let res = serde_json::to_string(line)
            .map_err(std::io::Error::other)
            .and_then(|s| writeln!(out, "{s}"));
        if let Err(e) = res {
            tracing::warn!(error = %e, "failed to write JSON line");
        }
    }

    fn drain(&mut self, sup: &mut ModeSupervisor, now: u64) {
        for rec in sup.consume_logs() {
            self.line(&JsonLine::Axis(&rec));
        }
        if let Some(sample) = sup.consume_environment() {
            if self.log_environment {
                tracing::info!(
                    t_ms = now,
                    temperature_c = sample.temperature_c,
                    humidity_pct = sample.humidity_pct,
                    "environment"
                );
            }
            self.line(&JsonLine::Environment { t_ms: now, sample });
        }
    }
}

fn print_summary(
    command: &'static str,
    summary: &RunSummary,
    axes: Vec<AxisReport>,
    json: bool,
) -> Result<()> {
    if json {
        let line = JsonLine::Summary {
            command,
            summary,
            axes,
        };
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }
    println!(
        "{command}: {} ticks, {} sleeps, {} ms elapsed, final mode {:?}, stopped by {:?}, {} light read failures",
        summary.ticks,
        summary.sleeps,
        summary.elapsed_ms,
        summary.final_mode,
        summary.stopped_by,
        summary.light_read_failures
    );
    for a in &axes {
        let mut line = format!("  axis {}: applied {:+.2}", a.axis, a.applied_norm);
        if let (Some(angle), Some(sun)) = (a.angle_deg, a.sun_deg) {
            line.push_str(&format!(", angle {angle:.1} deg, sun {sun:.1} deg"));
        }
        if let Some(writes) = a.bridge_writes {
            line.push_str(&format!(", {writes} bridge writes"));
        }
        if !a.has_bridge {
            line.push_str(" (tracking only)");
        }
        println!("{line}");
    }
    Ok(())
}

/// A closed-loop run against the simulated plant.
struct PlantRun {
    clock: TestClock,
    plant: SimPlant,
    supervisor: ModeSupervisor,
}

impl PlantRun {
    fn new(cfg: &Config, mut params: PlantParams) -> Result<Self> {
        params.pwm_range = pwm_range(cfg.axis_h.pwm_res_bits);
        let clock = TestClock::new();
        let plant = SimPlant::new(params, clock.clone());
        let bridge = |has: bool, axis: PlantAxis| -> Option<Box<dyn HBridge>> {
            has.then(|| Box::new(plant.bridge(axis)) as Box<dyn HBridge>)
        };
        let supervisor = build_supervisor(
            cfg,
            (plant.light_pair(PlantAxis::H), plant.light_pair(PlantAxis::V)),
            (
                bridge(cfg.axis_h.has_bridge(), PlantAxis::H),
                bridge(cfg.axis_v.has_bridge(), PlantAxis::V),
            ),
            plant.limits(
                plant_axis(cfg.endstop.axis.into()),
                cfg.endstop.active_high,
            ),
        )?;
        Ok(Self {
            clock,
            plant,
            supervisor,
        })
    }

    fn axes(&self) -> Vec<AxisReport> {
        [AxisId::H, AxisId::V]
            .into_iter()
            .map(|id| {
                let axis = self.supervisor.axis(id);
                AxisReport {
                    axis: id,
                    has_bridge: axis.has_bridge(),
                    applied_norm: axis.applied_norm(),
                    angle_deg: Some(self.plant.angle(plant_axis(id))),
                    sun_deg: Some(self.plant.sun(plant_axis(id))),
                    bridge_writes: None,
                }
            })
            .collect()
    }
}

pub fn simulate(
    cfg: &Config,
    opts: &SimOptions,
    shutdown: &AtomicBool,
    json: bool,
) -> Result<RunSummary> {
    let PlantRun {
        clock,
        plant,
        mut supervisor,
    } = PlantRun::new(cfg, opts.plant.clone())?;

    let button_cfg = ButtonCfg::from(&cfg.button);
    let mut button = TouchButton::new(button_cfg);
    let mut input = opts
        .presses
        .iter()
        .fold(ScriptedButton::new(clock.clone(), cfg.button.active_high), |b, p| {
            b.press(p.at_ms, p.hold_ms)
        });
    let mut power = SimPower::new(clock.clone())
        .with_boot_cause(opts.boot_cause)
        .with_wake_cause(opts.wake_cause);

    tracing::info!(
        duration_ms = opts.duration_ms,
        sun_h = opts.plant.sun_h_deg,
        sun_v = opts.plant.sun_v_deg,
        presses = opts.presses.len(),
        "simulation start"
    );

    let mut sink = RecordSink {
        out: opts.jsonl.then(|| std::io::stdout().lock()),
        log_environment: cfg.environment.log,
    };
    let summary = run(
        &mut supervisor,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &run_params(cfg, opts.duration_ms, opts.max_sleeps),
        shutdown,
        |sup, now| {
            if opts.fail_bridge_at.is_some_and(|at| now >= at) {
                plant.set_bridge_failing(PlantAxis::H, true);
            }
            sink.drain(sup, now);
        },
    )?;
    drop(sink);

    let finished = PlantRun {
        clock,
        plant,
        supervisor,
    };
    print_summary("simulate", &summary, finished.axes(), json || opts.jsonl)?;
    Ok(summary)
}

pub fn replay(
    cfg: &Config,
    trace: &Path,
    jsonl: bool,
    shutdown: &AtomicBool,
    json: bool,
) -> Result<RunSummary> {
    let rows = tracker_config::load_light_trace_csv(trace).map_err(|e| {
        e.wrap_err(TrackerError::Config(format!(
            "loading light trace {}",
            trace.display()
        )))
    })?;
    let end_ms = rows.last().map_or(0, |r| r.t_ms);
    let h_rows: Vec<(u64, u32, u32)> = rows.iter().map(|r| (r.t_ms, r.h_a, r.h_b)).collect();
    let v_rows: Vec<(u64, u32, u32)> = rows.iter().map(|r| (r.t_ms, r.v_a, r.v_b)).collect();
    tracing::info!(rows = rows.len(), end_ms, trace = %trace.display(), "replay start");

    let clock = TestClock::new();
    let bridge_h = RecordingBridge::new();
    let bridge_v = RecordingBridge::new();
    let writes = [bridge_h.log(), bridge_v.log()];
    let bridge = |has: bool, b: RecordingBridge| -> Option<Box<dyn HBridge>> {
        has.then(|| Box::new(b) as Box<dyn HBridge>)
    };
    let mut supervisor = build_supervisor(
        cfg,
        (
            ReplayLightPair::new(clock.clone(), h_rows),
            ReplayLightPair::new(clock.clone(), v_rows),
        ),
        (
            bridge(cfg.axis_h.has_bridge(), bridge_h),
            bridge(cfg.axis_v.has_bridge(), bridge_v),
        ),
        FixedLimits::open(cfg.endstop.active_high),
    )?;

    let mut button = TouchButton::new(ButtonCfg::from(&cfg.button));
    let mut input = ScriptedButton::new(clock.clone(), cfg.button.active_high);
    let mut power = SimPower::new(clock.clone());
    let mut sink = RecordSink {
        out: jsonl.then(|| std::io::stdout().lock()),
        log_environment: cfg.environment.log,
    };
    let tick_ms = cfg.runner.tick_ms.max(1);
    let summary = run(
        &mut supervisor,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &run_params(cfg, end_ms + tick_ms, None),
        shutdown,
        |sup, now| sink.drain(sup, now),
    )?;
    drop(sink);

    let axes = [AxisId::H, AxisId::V]
        .into_iter()
        .zip(writes)
        .map(|(id, log)| {
            let axis = supervisor.axis(id);
            AxisReport {
                axis: id,
                has_bridge: axis.has_bridge(),
                applied_norm: axis.applied_norm(),
                angle_deg: None,
                sun_deg: None,
                bridge_writes: Some(log.borrow().len()),
            }
        })
        .collect();
    print_summary("replay", &summary, axes, json || jsonl)?;
    Ok(summary)
}

/// Boot the configured stack against simulated hardware without running it.
pub fn check_config(cfg: &Config, path: &Path, json: bool) -> Result<()> {
    let booted = PlantRun::new(cfg, PlantParams::default())?;
    let limits = booted.supervisor.guard().limits_pressed();
    if json {
        let report = serde_json::json!({
            "kind": "check_config",
            "ok": true,
            "config": path.display().to_string(),
            "bridge_h": cfg.axis_h.has_bridge(),
            "bridge_v": cfg.axis_v.has_bridge(),
            "endstop_axis": AxisId::from(cfg.endstop.axis),
            "environment": cfg.environment.pin.is_some(),
            "tick_ms": cfg.runner.tick_ms,
        });
        println!("{report}");
        return Ok(());
    }
    let bridge = |has: bool| if has { "bridge" } else { "tracking only" };
    println!("config ok: {}", path.display());
    println!(
        "  axis h: {}, axis v: {}, endstop on axis {} (pressed at boot: {}/{})",
        bridge(cfg.axis_h.has_bridge()),
        bridge(cfg.axis_v.has_bridge()),
        AxisId::from(cfg.endstop.axis),
        limits.0,
        limits.1
    );
    Ok(())
}

/// Track the default simulated sun for a few seconds and require every
/// driven axis to end up no further from it than it started.
pub fn self_check(cfg: &Config, shutdown: &AtomicBool, json: bool) -> Result<()> {
    let PlantRun {
        clock,
        plant,
        mut supervisor,
    } = PlantRun::new(cfg, PlantParams::default())?;
    let error = |axis: PlantAxis| (plant.angle(axis) - plant.sun(axis)).abs();
    let before = [error(PlantAxis::H), error(PlantAxis::V)];

    let mut button = TouchButton::new(ButtonCfg::from(&cfg.button));
    let mut input = ScriptedButton::new(clock.clone(), cfg.button.active_high);
    let mut power = SimPower::new(clock.clone());
    let summary = run(
        &mut supervisor,
        &mut button,
        &mut input,
        &mut power,
        &clock,
        &run_params(cfg, SELF_CHECK_MS, None),
        shutdown,
        |sup, _| {
            sup.consume_logs();
        },
    )
    .wrap_err("self-check run")?;

    if summary.light_read_failures > 0 {
        eyre::bail!(TrackerError::Hardware(format!(
            "{} light reads failed",
            summary.light_read_failures
        )));
    }
    for (i, id) in [AxisId::H, AxisId::V].into_iter().enumerate() {
        if !supervisor.axis(id).has_bridge() {
            continue;
        }
        let after = error(plant_axis(id));
        if after > before[i] {
            eyre::bail!(TrackerError::State(format!(
                "axis {id} moved away from the light ({:.1} -> {after:.1} deg)",
                before[i]
            )));
        }
    }

    if json {
        println!(
            "{}",
            serde_json::json!({ "kind": "self_check", "ok": true, "ticks": summary.ticks })
        );
    } else {
        println!("self-check ok ({} ticks)", summary.ticks);
    }
    Ok(())
}
