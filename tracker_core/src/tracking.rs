//! Adaptive-deadband tracking decision for one axis.

use crate::config::{LowLightStep, TrackingCfg};
use crate::sensor::LightSample;
use crate::util::{abs_or_zero, clamp_percent, clamp_unit};

/// Result of evaluating one light sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackingCommand {
    /// Signed normalized target in [-1, 1].
    pub target_norm: f32,
    /// Deadband (percent) the target was derived with.
    pub effective_deadband: f32,
}

/// Turns light samples into signed speed commands.
#[derive(Debug, Clone)]
pub struct AxisTrackingLogic {
    cfg: TrackingCfg,
    // Enabled steps (level > 0).
    steps: Vec<LowLightStep>,
    last_sample: Option<LightSample>,
    last_command: TrackingCommand,
    new_sample: bool,
}

impl AxisTrackingLogic {
    pub fn new(cfg: TrackingCfg) -> Self {
        let steps: Vec<LowLightStep> = cfg
            .low_light
            .iter()
            .copied()
            .filter(|s| s.level > 0)
            .collect();
        let base = abs_or_zero(cfg.deadband_pct);
        Self {
            cfg,
            steps,
            last_sample: None,
            last_command: TrackingCommand {
                target_norm: 0.0,
                effective_deadband: base,
            },
            new_sample: false,
        }
    }

    /// Configured base deadband (percent, absolute).
    pub fn base_deadband(&self) -> f32 {
        abs_or_zero(self.cfg.deadband_pct)
    }

    /// Configured escalation threshold (percent, absolute).
    pub fn pwm_threshold(&self) -> f32 {
        abs_or_zero(self.cfg.pwm_threshold_pct)
    }

    /// Deadband for a sample: the base, widened by the widest low-light step
    /// the brighter channel falls under. Dimmer light never narrows it,
    /// whatever order the steps are given in.
    pub fn effective_deadband(&self, sample: &LightSample) -> f32 {
        let brightest = sample.avg_a.max(sample.avg_b);
        self.steps
            .iter()
            .filter(|s| brightest < s.level)
            .map(|s| abs_or_zero(s.deadband_pct))
            .fold(self.base_deadband(), f32::max)
    }

    /// Evaluate a fresh sample, overwrite the last command and raise the
    /// new-sample flag.
    pub fn evaluate(&mut self, sample: LightSample) -> TrackingCommand {
        let diff = clamp_percent(sample.diff_percent);
        let diff_abs = diff.abs();
        let deadband = self.effective_deadband(&sample);

        let target_norm = if diff_abs <= deadband {
            0.0
        } else {
            let min = clamp_unit(self.cfg.pwm_min_norm);
            let max = clamp_unit(self.cfg.pwm_max_norm);
            let magnitude = if diff_abs >= self.pwm_threshold() {
                min.max(max)
            } else {
                min.min(max)
            };
            if diff > 0.0 { magnitude } else { -magnitude }
        };

        let command = TrackingCommand {
            target_norm,
            effective_deadband: deadband,
        };
        tracing::debug!(
            diff_pct = diff,
            avg_a = sample.avg_a,
            avg_b = sample.avg_b,
            deadband_pct = deadband,
            target_norm,
            "tracking decision"
        );
        self.last_sample = Some(sample);
        self.last_command = command;
        self.new_sample = true;
        command
    }

    pub fn last_command(&self) -> TrackingCommand {
        self.last_command
    }

    pub fn last_effective_deadband(&self) -> f32 {
        self.last_command.effective_deadband
    }

    pub fn last_sample(&self) -> Option<&LightSample> {
        self.last_sample.as_ref()
    }

    pub fn has_new_sample(&self) -> bool {
        self.new_sample
    }

    /// Clear the new-sample flag, returning whether it was set.
    pub fn take_new_sample(&mut self) -> bool {
        std::mem::take(&mut self.new_sample)
    }
}
