#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and light-trace parsing for the solar tracker.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Light-trace CSV loader enforces headers and time ordering for replay.
use serde::Deserialize;

/// Default light sampling periods per axis (ms).
pub const H_READ_MS: u64 = 3;
pub const H_ACTION_MS: u64 = 120;
pub const V_READ_MS: u64 = 25;
pub const V_ACTION_MS: u64 = 500;

/// Maximum number of low-light deadband steps per axis.
pub const MAX_LOW_LIGHT_LEVELS: usize = 3;

/// Light trace CSV schema.
///
/// Expected headers:
/// t_ms,h_a,h_b,v_a,v_b
///
/// Example:
/// t_ms,h_a,h_b,v_a,v_b
/// 0,512,498,700,690
/// 25,515,497,702,688
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub h_a: u32,
    pub h_b: u32,
    pub v_a: u32,
    pub v_b: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AxisName {
    #[default]
    H,
    V,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct LowLightLevel {
    /// Brightest channel average below which this step applies (0 disables).
    pub level: u32,
    pub deadband_pct: f32,
}

/// One tracking axis: light pair, decision policy and H-bridge output.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AxisSection {
    pub ldr_a: Option<u8>,
    pub ldr_b: Option<u8>,
    /// H-bridge inputs; both absent builds a tracking-only axis. Pin defaults
    /// only apply when the whole section is omitted.
    pub in1: Option<u8>,
    pub in2: Option<u8>,
    /// Light read period (ms). Default: 3 for H, 25 for V.
    pub read_ms: Option<u64>,
    /// Averaging window (ms). Default: 120 for H, 500 for V.
    pub action_ms: Option<u64>,
    pub update_ms: u64,
    pub deadband_pct: f32,
    pub pwm_threshold_pct: f32,
    pub pwm_min_norm: f32,
    pub pwm_max_norm: f32,
    pub pwm_freq_hz: u32,
    pub pwm_res_bits: u8,
    pub smooth: f32,
    pub kick_norm: f32,
    pub kick_ms: u64,
    /// Emit per-sample axis log records.
    pub log: bool,
    pub low_light: Vec<LowLightLevel>,
    /// Hold this axis's motor off once its offset has stayed in the base
    /// deadband for `auto_block_hold_ms`. Only applies while nothing else
    /// decides the motor enable (Sleep mode, or Active without coordinator).
    pub auto_block: bool,
    pub auto_block_hold_ms: u64,
    pub auto_block_ms: u64,
}

impl Default for AxisSection {
    fn default() -> Self {
        Self {
            ldr_a: None,
            ldr_b: None,
            in1: None,
            in2: None,
            read_ms: None,
            action_ms: None,
            update_ms: 30,
            deadband_pct: 1.0,
            pwm_threshold_pct: 10.0,
            pwm_min_norm: 0.8,
            pwm_max_norm: 0.99,
            pwm_freq_hz: 20_000,
            pwm_res_bits: 8,
            smooth: 0.0,
            kick_norm: 0.8,
            kick_ms: 200,
            log: true,
            low_light: Vec::new(),
            auto_block: false,
            auto_block_hold_ms: 1_500,
            auto_block_ms: 10_000,
        }
    }
}

impl AxisSection {
    fn horizontal() -> Self {
        Self {
            ldr_a: Some(33),
            ldr_b: Some(35),
            in1: Some(16),
            in2: Some(17),
            ..Self::default()
        }
    }

    fn vertical() -> Self {
        Self {
            ldr_a: Some(33),
            ldr_b: Some(35),
            ..Self::default()
        }
    }

    pub fn read_ms(&self, axis: AxisName) -> u64 {
        self.read_ms.unwrap_or(match axis {
            AxisName::H => H_READ_MS,
            AxisName::V => V_READ_MS,
        })
    }

    pub fn action_ms(&self, axis: AxisName) -> u64 {
        self.action_ms.unwrap_or(match axis {
            AxisName::H => H_ACTION_MS,
            AxisName::V => V_ACTION_MS,
        })
    }

    pub fn has_bridge(&self) -> bool {
        self.in1.is_some() && self.in2.is_some()
    }

    fn validate(&self, name: &str, axis: AxisName) -> eyre::Result<()> {
        let read_ms = self.read_ms(axis);
        let action_ms = self.action_ms(axis);
        if read_ms == 0 {
            eyre::bail!("{name}.read_ms must be >= 1");
        }
        if action_ms < read_ms {
            eyre::bail!("{name}.action_ms must be >= {name}.read_ms");
        }
        if self.update_ms > 10_000 {
            eyre::bail!("{name}.update_ms is unreasonably large (>10s)");
        }
        if self.in1.is_some() != self.in2.is_some() {
            eyre::bail!("{name}.in1 and {name}.in2 must be set together");
        }
        if self.in1.is_some() && self.in1 == self.in2 {
            eyre::bail!("{name}.in1 and {name}.in2 must be different pins");
        }
        check_percent(&format!("{name}.deadband_pct"), self.deadband_pct)?;
        check_percent(&format!("{name}.pwm_threshold_pct"), self.pwm_threshold_pct)?;
        check_unit(&format!("{name}.pwm_min_norm"), self.pwm_min_norm)?;
        check_unit(&format!("{name}.pwm_max_norm"), self.pwm_max_norm)?;
        check_unit(&format!("{name}.smooth"), self.smooth)?;
        check_unit(&format!("{name}.kick_norm"), self.kick_norm)?;
        if !(1..=16).contains(&self.pwm_res_bits) {
            eyre::bail!("{name}.pwm_res_bits must be in 1..=16");
        }
        if self.pwm_freq_hz == 0 {
            eyre::bail!("{name}.pwm_freq_hz must be > 0");
        }
        if self.kick_ms > 10_000 {
            eyre::bail!("{name}.kick_ms is unreasonably large (>10s)");
        }
        if self.auto_block && self.auto_block_ms == 0 {
            eyre::bail!("{name}.auto_block_ms must be >= 1 when auto_block is on");
        }

        // Low light: enabled levels strictly descending (brightest first) with
        // deadbands that do not shrink as it gets darker.
        if self.low_light.len() > MAX_LOW_LIGHT_LEVELS {
            eyre::bail!(
                "{name}.low_light allows at most {MAX_LOW_LIGHT_LEVELS} levels, got {}",
                self.low_light.len()
            );
        }
        let mut prev: Option<&LowLightLevel> = None;
        for (i, step) in self.low_light.iter().enumerate() {
            check_percent(&format!("{name}.low_light[{i}].deadband_pct"), step.deadband_pct)?;
            if step.level == 0 {
                continue;
            }
            if let Some(p) = prev {
                if step.level >= p.level {
                    eyre::bail!("{name}.low_light levels must be strictly descending");
                }
                if step.deadband_pct < p.deadband_pct {
                    eyre::bail!("{name}.low_light deadbands must not decrease as levels get darker");
                }
            }
            prev = Some(step);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CoordinatorSection {
    pub enabled: bool,
    pub hold_ms: u64,
    pub block_ms: u64,
    /// Defaults to the H axis base deadband.
    pub deadband_h_pct: Option<f32>,
    /// Defaults to the V axis base deadband.
    pub deadband_v_pct: Option<f32>,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_ms: 1_500,
            block_ms: 10_000,
            deadband_h_pct: None,
            deadband_v_pct: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EndstopSection {
    pub pin_a: Option<u8>,
    pub pin_b: Option<u8>,
    /// Treat high level as pressed when true
    pub active_high: bool,
    pub use_pullup: bool,
    pub debounce_ms: u64,
    pub sweep_norm: f32,
    /// Direction moving away from limit A: +1 or -1
    pub dir_from_a: i8,
    /// Direction moving away from limit B: +1 or -1
    pub dir_from_b: i8,
    pub axis: AxisName,
}

impl Default for EndstopSection {
    fn default() -> Self {
        Self {
            pin_a: None,
            pin_b: None,
            active_high: false,
            use_pullup: true,
            debounce_ms: 30,
            sweep_norm: 0.9,
            dir_from_a: 1,
            dir_from_b: -1,
            axis: AxisName::H,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ButtonSection {
    pub pin: Option<u8>,
    pub active_high: bool,
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    /// Max wait for release before entering sleep (ms)
    pub release_wait_ms: u64,
}

impl Default for ButtonSection {
    fn default() -> Self {
        Self {
            pin: None,
            active_high: true,
            debounce_ms: 40,
            long_press_ms: 1_500,
            release_wait_ms: 3_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SleepSection {
    pub auto_from_active: bool,
    pub hold_ms: u64,
    pub wake_interval_ms: u64,
    pub wake_on_touch: bool,
}

impl Default for SleepSection {
    fn default() -> Self {
        Self {
            auto_from_active: true,
            hold_ms: 60_000,
            wake_interval_ms: 600_000,
            wake_on_touch: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnvironmentSection {
    pub pin: Option<u8>,
    pub report_ms: u64,
    pub samples: u32,
    pub log: bool,
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            pin: Some(21),
            report_ms: 20_000,
            samples: 5,
            log: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySection {
    pub refresh_ms: u64,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self { refresh_ms: 500 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerSection {
    /// Control loop period (ms)
    pub tick_ms: u64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self { tick_ms: 1 }
    }
}

fn default_axis_h() -> AxisSection {
    AxisSection::horizontal()
}

fn default_axis_v() -> AxisSection {
    AxisSection::vertical()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_axis_h")]
    pub axis_h: AxisSection,
    #[serde(default = "default_axis_v")]
    pub axis_v: AxisSection,
    #[serde(default)]
    pub coordinator: CoordinatorSection,
    #[serde(default)]
    pub endstop: EndstopSection,
    #[serde(default)]
    pub button: ButtonSection,
    #[serde(default)]
    pub sleep: SleepSection,
    #[serde(default)]
    pub environment: EnvironmentSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            axis_h: AxisSection::horizontal(),
            axis_v: AxisSection::vertical(),
            coordinator: CoordinatorSection::default(),
            endstop: EndstopSection::default(),
            button: ButtonSection::default(),
            sleep: SleepSection::default(),
            environment: EnvironmentSection::default(),
            display: DisplaySection::default(),
            logging: Logging::default(),
            runner: RunnerSection::default(),
        }
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn check_percent(field: &str, v: f32) -> eyre::Result<()> {
    if !(v.is_finite() && (0.0..=100.0).contains(&v)) {
        eyre::bail!("{field} must be in [0.0, 100.0]");
    }
    Ok(())
}

fn check_unit(field: &str, v: f32) -> eyre::Result<()> {
    if !(v.is_finite() && (0.0..=1.0).contains(&v)) {
        eyre::bail!("{field} must be in [0.0, 1.0]");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Axes
        self.axis_h.validate("axis_h", AxisName::H)?;
        self.axis_v.validate("axis_v", AxisName::V)?;

        // Coordinator
        if self.coordinator.block_ms == 0 {
            eyre::bail!("coordinator.block_ms must be >= 1");
        }
        if let Some(db) = self.coordinator.deadband_h_pct {
            check_percent("coordinator.deadband_h_pct", db)?;
        }
        if let Some(db) = self.coordinator.deadband_v_pct {
            check_percent("coordinator.deadband_v_pct", db)?;
        }

        // Endstop
        for (field, dir) in [
            ("endstop.dir_from_a", self.endstop.dir_from_a),
            ("endstop.dir_from_b", self.endstop.dir_from_b),
        ] {
            if dir != 1 && dir != -1 {
                eyre::bail!("{field} must be +1 or -1");
            }
        }
        if self.endstop.dir_from_a == self.endstop.dir_from_b {
            eyre::bail!("endstop.dir_from_a and endstop.dir_from_b must differ");
        }
        if !(self.endstop.sweep_norm.is_finite()
            && self.endstop.sweep_norm > 0.0
            && self.endstop.sweep_norm <= 1.0)
        {
            eyre::bail!("endstop.sweep_norm must be in (0.0, 1.0]");
        }
        if self.endstop.debounce_ms > 5_000 {
            eyre::bail!("endstop.debounce_ms is unreasonably large (>5s)");
        }
        if let (Some(a), Some(b)) = (self.endstop.pin_a, self.endstop.pin_b)
            && a == b
        {
            eyre::bail!("endstop.pin_a and endstop.pin_b must be different pins");
        }

        // Button
        if self.button.long_press_ms <= self.button.debounce_ms {
            eyre::bail!("button.long_press_ms must be > button.debounce_ms");
        }

        // Sleep
        if self.sleep.wake_interval_ms == 0 {
            eyre::bail!("sleep.wake_interval_ms must be >= 1");
        }

        // Environment
        if self.environment.samples == 0 {
            eyre::bail!("environment.samples must be >= 1");
        }
        if self.environment.report_ms == 0 {
            eyre::bail!("environment.report_ms must be >= 1");
        }

        // Display
        if self.display.refresh_ms == 0 {
            eyre::bail!("display.refresh_ms must be >= 1");
        }

        // Runner
        if self.runner.tick_ms == 0 {
            eyre::bail!("runner.tick_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

pub fn load_light_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open light trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "h_a", "h_b", "v_a", "v_b"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "light trace CSV must have headers 't_ms,h_a,h_b,v_a,v_b', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "light trace t_ms must be non-decreasing (row {}: {} < {})",
                idx + 2,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }

    if rows.is_empty() {
        eyre::bail!("light trace CSV has no rows");
    }
    Ok(rows)
}
