//! Simulated two-axis mount under a moving sun.
//!
//! The plant integrates motor motion lazily against a shared `TestClock`:
//! every device access first advances the physics to the clock's current
//! time. Device handles share the plant through `Rc<RefCell<_>>`; the whole
//! simulation is single-threaded like the control loop it feeds.

use std::cell::RefCell;
use std::rc::Rc;

use tracker_traits::clock::test_clock::TestClock;
use tracker_traits::{HBridge, HwResult, LightPair, LimitSwitches};

use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantAxis {
    H,
    V,
}

#[derive(Debug, Clone)]
pub struct PlantParams {
    /// Initial sun position per axis (degrees).
    pub sun_h_deg: f32,
    pub sun_v_deg: f32,
    /// Sun drift per axis (degrees per second).
    pub sun_rate_h_deg_s: f32,
    pub sun_rate_v_deg_s: f32,
    /// Raw count a channel reads when facing the sun head-on.
    pub ambient: u32,
    /// Initial mount position (degrees).
    pub axis_h_deg: f32,
    pub axis_v_deg: f32,
    /// Mechanical travel per axis (degrees); limit A sits at the low end.
    pub h_range_deg: (f32, f32),
    pub v_range_deg: (f32, f32),
    /// Slew rate at full duty (degrees per second).
    pub max_rate_deg_s: f32,
    /// Full-scale duty the bridges are driven with.
    pub pwm_range: u32,
    /// Distance from a travel end at which its limit switch closes (degrees).
    pub limit_margin_deg: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            sun_h_deg: 20.0,
            sun_v_deg: 40.0,
            sun_rate_h_deg_s: 0.0,
            sun_rate_v_deg_s: 0.0,
            ambient: 3_000,
            axis_h_deg: 0.0,
            axis_v_deg: 30.0,
            h_range_deg: (-90.0, 90.0),
            v_range_deg: (0.0, 90.0),
            max_rate_deg_s: 6.0,
            pwm_range: 255,
            limit_margin_deg: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
struct AxisBody {
    angle_deg: f32,
    range_deg: (f32, f32),
    duty_norm: f32,
    sun_deg: f32,
    sun_rate_deg_s: f32,
    light_failures: u32,
    bridge_failing: bool,
    writes: u64,
}

#[derive(Debug)]
struct PlantState {
    h: AxisBody,
    v: AxisBody,
    ambient: u32,
    max_rate_deg_s: f32,
    pwm_range: u32,
    limit_margin_deg: f32,
    last_ms: u64,
}

impl PlantState {
    fn body(&mut self, axis: PlantAxis) -> &mut AxisBody {
        match axis {
            PlantAxis::H => &mut self.h,
            PlantAxis::V => &mut self.v,
        }
    }

    fn sync(&mut self, now_ms: u64) {
        let dt_s = now_ms.saturating_sub(self.last_ms) as f32 / 1000.0;
        self.last_ms = now_ms.max(self.last_ms);
        if dt_s <= 0.0 {
            return;
        }
        let rate = self.max_rate_deg_s;
        for body in [&mut self.h, &mut self.v] {
            body.sun_deg += body.sun_rate_deg_s * dt_s;
            let (lo, hi) = body.range_deg;
            body.angle_deg = (body.angle_deg + body.duty_norm * rate * dt_s).clamp(lo, hi);
        }
    }

    fn light(&self, body: &AxisBody) -> (u32, u32) {
        let offset = (body.sun_deg - body.angle_deg).clamp(-90.0, 90.0).to_radians();
        let s = offset.sin();
        let ambient = self.ambient as f32;
        let a = (ambient * (1.0 + s) / 2.0).round().max(0.0);
        let b = (ambient * (1.0 - s) / 2.0).round().max(0.0);
        (a as u32, b as u32)
    }

    fn limits(&self, body: &AxisBody) -> (bool, bool) {
        let (lo, hi) = body.range_deg;
        (
            body.angle_deg <= lo + self.limit_margin_deg,
            body.angle_deg >= hi - self.limit_margin_deg,
        )
    }
}

/// Handle to the simulated plant. Clones share state.
#[derive(Debug, Clone)]
pub struct SimPlant {
    state: Rc<RefCell<PlantState>>,
    clock: TestClock,
}

impl SimPlant {
    pub fn new(params: PlantParams, clock: TestClock) -> Self {
        let body = |angle_deg, range_deg, sun_deg, sun_rate_deg_s| AxisBody {
            angle_deg,
            range_deg,
            duty_norm: 0.0,
            sun_deg,
            sun_rate_deg_s,
            light_failures: 0,
            bridge_failing: false,
            writes: 0,
        };
        let state = PlantState {
            h: body(
                params.axis_h_deg,
                params.h_range_deg,
                params.sun_h_deg,
                params.sun_rate_h_deg_s,
            ),
            v: body(
                params.axis_v_deg,
                params.v_range_deg,
                params.sun_v_deg,
                params.sun_rate_v_deg_s,
            ),
            ambient: params.ambient,
            max_rate_deg_s: params.max_rate_deg_s,
            pwm_range: params.pwm_range.max(1),
            limit_margin_deg: params.limit_margin_deg,
            last_ms: clock.elapsed_ms(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            clock,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut PlantState) -> R) -> R {
        let mut state = self.state.borrow_mut();
        state.sync(self.clock.elapsed_ms());
        f(&mut state)
    }

    pub fn clock(&self) -> &TestClock {
        &self.clock
    }

    pub fn light_pair(&self, axis: PlantAxis) -> SimLightPair {
        SimLightPair {
            plant: self.clone(),
            axis,
        }
    }

    pub fn bridge(&self, axis: PlantAxis) -> SimBridge {
        SimBridge {
            plant: self.clone(),
            axis,
        }
    }

    /// Limit switches mounted at both travel ends of `axis`.
    pub fn limits(&self, axis: PlantAxis, active_high: bool) -> SimLimits {
        SimLimits {
            plant: self.clone(),
            axis,
            active_high,
        }
    }

    pub fn angle(&self, axis: PlantAxis) -> f32 {
        self.with(|s| s.body(axis).angle_deg)
    }

    pub fn set_angle(&self, axis: PlantAxis, deg: f32) {
        self.with(|s| {
            let body = s.body(axis);
            body.angle_deg = deg.clamp(body.range_deg.0, body.range_deg.1);
        });
    }

    pub fn sun(&self, axis: PlantAxis) -> f32 {
        self.with(|s| s.body(axis).sun_deg)
    }

    pub fn set_sun(&self, axis: PlantAxis, deg: f32) {
        self.with(|s| s.body(axis).sun_deg = deg);
    }

    pub fn set_ambient(&self, ambient: u32) {
        self.with(|s| s.ambient = ambient);
    }

    /// Signed normalized duty the axis motor currently receives.
    pub fn duty(&self, axis: PlantAxis) -> f32 {
        self.with(|s| s.body(axis).duty_norm)
    }

    /// Number of bridge writes seen on `axis`.
    pub fn writes(&self, axis: PlantAxis) -> u64 {
        self.with(|s| s.body(axis).writes)
    }

    /// Fail the next `n` light reads on `axis`.
    pub fn fail_light_reads(&self, axis: PlantAxis, n: u32) {
        self.with(|s| s.body(axis).light_failures = n);
    }

    /// Make bridge writes on `axis` fail until cleared.
    pub fn set_bridge_failing(&self, axis: PlantAxis, failing: bool) {
        self.with(|s| s.body(axis).bridge_failing = failing);
    }

    /// Debounce-free limit levels (A, B) of `axis`: true means closed.
    pub fn limits_closed(&self, axis: PlantAxis) -> (bool, bool) {
        self.with(|s| {
            let body = s.body(axis).clone();
            s.limits(&body)
        })
    }
}

pub struct SimLightPair {
    plant: SimPlant,
    axis: PlantAxis,
}

impl LightPair for SimLightPair {
    fn read(&mut self) -> HwResult<(u32, u32)> {
        let axis = self.axis;
        self.plant.with(|s| -> HwResult<(u32, u32)> {
            let body = s.body(axis);
            if body.light_failures > 0 {
                body.light_failures -= 1;
                return Err(Box::new(HwError::Timeout));
            }
            let body = body.clone();
            Ok(s.light(&body))
        })
    }
}

pub struct SimBridge {
    plant: SimPlant,
    axis: PlantAxis,
}

impl HBridge for SimBridge {
    fn write(&mut self, in1: u32, in2: u32) -> HwResult<()> {
        if in1 != 0 && in2 != 0 {
            return Err(Box::new(HwError::Gpio(format!(
                "both bridge inputs driven ({in1}, {in2})"
            ))));
        }
        let axis = self.axis;
        self.plant.with(|s| -> HwResult<()> {
            let range = s.pwm_range as f32;
            let body = s.body(axis);
            if body.bridge_failing {
                return Err(Box::new(HwError::Gpio("bridge output stuck".into())));
            }
            body.writes += 1;
            body.duty_norm = ((in1 as f32 - in2 as f32) / range).clamp(-1.0, 1.0);
            Ok(())
        })
    }
}

pub struct SimLimits {
    plant: SimPlant,
    axis: PlantAxis,
    active_high: bool,
}

impl LimitSwitches for SimLimits {
    fn read_levels(&mut self) -> HwResult<(bool, bool)> {
        let (a, b) = self.plant.limits_closed(self.axis);
        // Electrical level: a closed switch drives the active level.
        Ok((a == self.active_high, b == self.active_high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_moves_axis_towards_positive_on_in1() {
        let clock = TestClock::new();
        let plant = SimPlant::new(PlantParams::default(), clock.clone());
        let mut bridge = plant.bridge(PlantAxis::H);
        bridge.write(255, 0).unwrap();
        clock.advance_ms(1_000);
        assert!((plant.angle(PlantAxis::H) - 6.0).abs() < 1e-3);
        bridge.write(0, 255).unwrap();
        clock.advance_ms(500);
        assert!((plant.angle(PlantAxis::H) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn brighter_channel_faces_the_sun() {
        let clock = TestClock::new();
        let plant = SimPlant::new(PlantParams::default(), clock);
        let (a, b) = plant.light_pair(PlantAxis::H).read().unwrap();
        assert!(a > b, "sun ahead of the mount should light channel A");
        plant.set_angle(PlantAxis::H, 20.0);
        let (a, b) = plant.light_pair(PlantAxis::H).read().unwrap();
        assert_eq!(a, b);
    }
}
