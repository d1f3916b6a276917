//! Runtime configuration types for the control stack.
//!
//! These are the plain structs the components consume. They are separate from
//! the TOML-deserialized config in `tracker_config`; see `conversions`.

use serde::{Deserialize, Serialize};

/// Which mechanical axis a component refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    H,
    V,
}

impl AxisId {
    pub fn as_str(self) -> &'static str {
        match self {
            AxisId::H => "h",
            AxisId::V => "v",
        }
    }
}

impl core::fmt::Display for AxisId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Differential light sampling periods.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Period between raw reads (ms). 0 reads every tick.
    pub read_ms: u64,
    /// Averaging window (ms); window size is `action_ms / read_ms`, at least 1.
    pub action_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            read_ms: 3,
            action_ms: 120,
        }
    }
}

/// One low-light deadband widening step. `level == 0` disables the step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowLightStep {
    /// Brightest channel average below which the step applies (raw counts).
    pub level: u32,
    /// Deadband used while the step applies (percent).
    pub deadband_pct: f32,
}

/// Tracking decision policy.
#[derive(Debug, Clone)]
pub struct TrackingCfg {
    /// Base deadband (percent of differential offset).
    pub deadband_pct: f32,
    /// Offsets at or above this use the high speed (percent).
    pub pwm_threshold_pct: f32,
    /// Normalized duty bounds; the smaller is the low speed, the larger the high speed.
    pub pwm_min_norm: f32,
    pub pwm_max_norm: f32,
    /// Up to three low-light steps, any order; the widest one that applies wins.
    pub low_light: Vec<LowLightStep>,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            deadband_pct: 1.0,
            pwm_threshold_pct: 10.0,
            pwm_min_norm: 0.8,
            pwm_max_norm: 0.99,
            low_light: Vec::new(),
        }
    }
}

/// H-bridge output shaping.
#[derive(Debug, Clone)]
pub struct ActuatorCfg {
    /// Re-evaluation period (ms). 0 updates every tick.
    pub update_ms: u64,
    /// PWM resolution in bits (1..=16); full scale is `2^bits - 1`.
    pub pwm_res_bits: u8,
    /// Exponential smoothing: 0 = instant, towards 1 = arbitrarily slow.
    pub smooth: f32,
    /// Minimum magnitude held during the kick window (0 disables).
    pub kick_norm: f32,
    /// Kick window length (ms; 0 disables).
    pub kick_ms: u64,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            update_ms: 30,
            pwm_res_bits: 8,
            smooth: 0.0,
            kick_norm: 0.8,
            kick_ms: 200,
        }
    }
}

/// Single-axis anti-dither, used only while nothing overrides the motor
/// enable (Sleep mode, or Active with the coordinator off).
#[derive(Debug, Clone)]
pub struct AutoBlockCfg {
    pub enabled: bool,
    /// Offset must stay inside the base deadband this long before blocking (ms).
    pub hold_ms: u64,
    /// Length of one block window (ms).
    pub block_ms: u64,
}

impl Default for AutoBlockCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            hold_ms: 1_500,
            block_ms: 10_000,
        }
    }
}

/// Everything one axis needs.
#[derive(Debug, Clone)]
pub struct AxisCfg {
    pub sensor: SensorCfg,
    pub tracking: TrackingCfg,
    pub actuator: ActuatorCfg,
    pub auto_block: AutoBlockCfg,
    /// Produce one `AxisLogRecord` per processed sample.
    pub log: bool,
}

impl Default for AxisCfg {
    fn default() -> Self {
        Self {
            sensor: SensorCfg::default(),
            tracking: TrackingCfg::default(),
            actuator: ActuatorCfg::default(),
            auto_block: AutoBlockCfg::default(),
            log: true,
        }
    }
}

/// Dual-axis anti-dither coordination.
#[derive(Debug, Clone)]
pub struct CoordinatorCfg {
    /// Whether Active mode uses the coordinator at all.
    pub enabled: bool,
    /// Deadbands (percent) the coordinator compares against.
    pub deadband_h_pct: f32,
    pub deadband_v_pct: f32,
    /// Both axes must stay in deadband this long before blocking (ms).
    pub hold_ms: u64,
    /// Length of one block window (ms).
    pub block_ms: u64,
}

impl Default for CoordinatorCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            deadband_h_pct: 1.0,
            deadband_v_pct: 1.0,
            hold_ms: 1_500,
            block_ms: 10_000,
        }
    }
}

/// Travel limit switches and the safety sweep.
#[derive(Debug, Clone)]
pub struct EndstopCfg {
    /// Raw high level means pressed when true.
    pub active_high: bool,
    /// New level must hold this long before it is accepted (ms).
    pub debounce_ms: u64,
    /// Sweep magnitude (normalized).
    pub sweep_norm: f32,
    /// Direction that moves away from limit A (+1 / -1).
    pub dir_from_a: i8,
    /// Direction that moves away from limit B (+1 / -1).
    pub dir_from_b: i8,
    /// Axis the limits are mounted on.
    pub axis: AxisId,
}

impl Default for EndstopCfg {
    fn default() -> Self {
        Self {
            active_high: false,
            debounce_ms: 30,
            sweep_norm: 0.9,
            dir_from_a: 1,
            dir_from_b: -1,
            axis: AxisId::H,
        }
    }
}

/// Touch button timing.
#[derive(Debug, Clone)]
pub struct ButtonCfg {
    pub active_high: bool,
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    /// Upper bound on waiting for release before sleeping (ms).
    pub release_wait_ms: u64,
}

impl Default for ButtonCfg {
    fn default() -> Self {
        Self {
            active_high: true,
            debounce_ms: 40,
            long_press_ms: 1_500,
            release_wait_ms: 3_000,
        }
    }
}

/// Sleep cycle.
#[derive(Debug, Clone)]
pub struct SleepCfg {
    /// Allow the in-deadband hold to put an Active tracker to sleep.
    pub auto_from_active: bool,
    /// Both axes in deadband this long triggers sleep entry (ms).
    pub hold_ms: u64,
    /// Wake timer armed on sleep entry (ms).
    pub wake_interval_ms: u64,
    /// Arm the touch input as a wake source.
    pub wake_on_touch: bool,
}

impl Default for SleepCfg {
    fn default() -> Self {
        Self {
            auto_from_active: true,
            hold_ms: 60_000,
            wake_interval_ms: 600_000,
            wake_on_touch: true,
        }
    }
}

/// Temperature/humidity averaging.
#[derive(Debug, Clone)]
pub struct EnvironmentCfg {
    pub report_ms: u64,
    pub samples: u32,
}

impl Default for EnvironmentCfg {
    fn default() -> Self {
        Self {
            report_ms: 20_000,
            samples: 5,
        }
    }
}

/// Supervisor-level configuration.
#[derive(Debug, Clone)]
pub struct SupervisorCfg {
    pub coordinator: CoordinatorCfg,
    pub endstop: EndstopCfg,
    pub sleep: SleepCfg,
    /// Display frame period (ms).
    pub display_refresh_ms: u64,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorCfg::default(),
            endstop: EndstopCfg::default(),
            sleep: SleepCfg::default(),
            display_refresh_ms: 500,
        }
    }
}
