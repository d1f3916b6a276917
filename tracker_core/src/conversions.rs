//! `From` implementations bridging `tracker_config` types to `tracker_core` types.

use tracker_config::{AxisName, AxisSection};

use crate::config::{
    ActuatorCfg, AutoBlockCfg, AxisCfg, AxisId, ButtonCfg, CoordinatorCfg, EndstopCfg,
    EnvironmentCfg, LowLightStep, SensorCfg, SleepCfg, SupervisorCfg, TrackingCfg,
};

// ── AxisId ───────────────────────────────────────────────────────────────────

impl From<AxisName> for AxisId {
    fn from(a: AxisName) -> Self {
        match a {
            AxisName::H => AxisId::H,
            AxisName::V => AxisId::V,
        }
    }
}

impl From<AxisId> for AxisName {
    fn from(a: AxisId) -> Self {
        match a {
            AxisId::H => AxisName::H,
            AxisId::V => AxisName::V,
        }
    }
}

// ── AxisCfg ──────────────────────────────────────────────────────────────────

impl AxisCfg {
    /// Per-axis defaults (read/action periods) depend on which axis the
    /// section configures, so this takes the id alongside the section.
    pub fn from_section(id: AxisId, c: &AxisSection) -> Self {
        let name = AxisName::from(id);
        Self {
            sensor: SensorCfg {
                read_ms: c.read_ms(name),
                action_ms: c.action_ms(name),
            },
            tracking: TrackingCfg::from(c),
            actuator: ActuatorCfg::from(c),
            auto_block: AutoBlockCfg::from(c),
            log: c.log,
        }
    }
}

impl From<&AxisSection> for TrackingCfg {
    fn from(c: &AxisSection) -> Self {
        Self {
            deadband_pct: c.deadband_pct,
            pwm_threshold_pct: c.pwm_threshold_pct,
            pwm_min_norm: c.pwm_min_norm,
            pwm_max_norm: c.pwm_max_norm,
            low_light: c
                .low_light
                .iter()
                .map(|l| LowLightStep {
                    level: l.level,
                    deadband_pct: l.deadband_pct,
                })
                .collect(),
        }
    }
}

impl From<&AxisSection> for ActuatorCfg {
    fn from(c: &AxisSection) -> Self {
        Self {
            update_ms: c.update_ms,
            pwm_res_bits: c.pwm_res_bits,
            smooth: c.smooth,
            kick_norm: c.kick_norm,
            kick_ms: c.kick_ms,
        }
    }
}

impl From<&AxisSection> for AutoBlockCfg {
    fn from(c: &AxisSection) -> Self {
        Self {
            enabled: c.auto_block,
            hold_ms: c.auto_block_hold_ms,
            block_ms: c.auto_block_ms,
        }
    }
}

// ── Supervisor ───────────────────────────────────────────────────────────────

impl From<&tracker_config::EndstopSection> for EndstopCfg {
    fn from(c: &tracker_config::EndstopSection) -> Self {
        Self {
            active_high: c.active_high,
            debounce_ms: c.debounce_ms,
            sweep_norm: c.sweep_norm,
            dir_from_a: c.dir_from_a,
            dir_from_b: c.dir_from_b,
            axis: c.axis.into(),
        }
    }
}

impl From<&tracker_config::SleepSection> for SleepCfg {
    fn from(c: &tracker_config::SleepSection) -> Self {
        Self {
            auto_from_active: c.auto_from_active,
            hold_ms: c.hold_ms,
            wake_interval_ms: c.wake_interval_ms,
            wake_on_touch: c.wake_on_touch,
        }
    }
}

impl From<&tracker_config::ButtonSection> for ButtonCfg {
    fn from(c: &tracker_config::ButtonSection) -> Self {
        Self {
            active_high: c.active_high,
            debounce_ms: c.debounce_ms,
            long_press_ms: c.long_press_ms,
            release_wait_ms: c.release_wait_ms,
        }
    }
}

impl From<&tracker_config::EnvironmentSection> for EnvironmentCfg {
    fn from(c: &tracker_config::EnvironmentSection) -> Self {
        Self {
            report_ms: c.report_ms,
            samples: c.samples,
        }
    }
}

/// Coordinator deadbands fall back to each axis's base deadband.
impl From<&tracker_config::Config> for CoordinatorCfg {
    fn from(c: &tracker_config::Config) -> Self {
        Self {
            enabled: c.coordinator.enabled,
            deadband_h_pct: c
                .coordinator
                .deadband_h_pct
                .unwrap_or(c.axis_h.deadband_pct),
            deadband_v_pct: c
                .coordinator
                .deadband_v_pct
                .unwrap_or(c.axis_v.deadband_pct),
            hold_ms: c.coordinator.hold_ms,
            block_ms: c.coordinator.block_ms,
        }
    }
}

impl From<&tracker_config::Config> for SupervisorCfg {
    fn from(c: &tracker_config::Config) -> Self {
        Self {
            coordinator: CoordinatorCfg::from(c),
            endstop: EndstopCfg::from(&c.endstop),
            sleep: SleepCfg::from(&c.sleep),
            display_refresh_ms: c.display.refresh_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_axis_gets_vertical_timing() {
        let cfg = tracker_config::Config::default();
        let v = AxisCfg::from_section(AxisId::V, &cfg.axis_v);
        assert_eq!(v.sensor.read_ms, 25);
        assert_eq!(v.sensor.action_ms, 500);
        let h = AxisCfg::from_section(AxisId::H, &cfg.axis_h);
        assert_eq!(h.sensor.read_ms, 3);
    }

    #[test]
    fn coordinator_deadband_defaults_to_axis_base() {
        let mut cfg = tracker_config::Config::default();
        cfg.axis_v.deadband_pct = 2.5;
        cfg.coordinator.deadband_h_pct = Some(4.0);
        let c = CoordinatorCfg::from(&cfg);
        assert_eq!(c.deadband_h_pct, 4.0);
        assert_eq!(c.deadband_v_pct, 2.5);
    }

    #[test]
    fn auto_block_is_carried_per_axis() {
        let mut cfg = tracker_config::Config::default();
        cfg.axis_h.auto_block = true;
        cfg.axis_h.auto_block_hold_ms = 800;
        let h = AxisCfg::from_section(AxisId::H, &cfg.axis_h);
        assert!(h.auto_block.enabled);
        assert_eq!(h.auto_block.hold_ms, 800);
        assert_eq!(h.auto_block.block_ms, 10_000);
        assert!(!AxisCfg::from_section(AxisId::V, &cfg.axis_v).auto_block.enabled);
    }
}
