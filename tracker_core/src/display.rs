//! Status frame pushed to an optional display.

use serde::Serialize;
use tracker_traits::HwResult;

use crate::endstop::SweepState;
use crate::environment::EnvironmentSample;
use crate::supervisor::SystemMode;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisView {
    pub diff_percent: Option<f32>,
    pub effective_deadband: f32,
    pub applied_norm: f32,
    pub motor_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFrame {
    pub t_ms: u64,
    pub mode: SystemMode,
    pub h: AxisView,
    pub v: AxisView,
    pub pwm_threshold_pct: f32,
    pub coordinator_blocked: bool,
    pub sweep: SweepState,
    pub environment: Option<EnvironmentSample>,
}

/// Output-only status consumer.
pub trait DisplaySink {
    fn push(&mut self, frame: &DisplayFrame) -> HwResult<()>;
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn push(&mut self, frame: &DisplayFrame) -> HwResult<()> {
        (**self).push(frame)
    }
}
