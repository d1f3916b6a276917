//! Stand-alone simulated peripherals: touch button, power manager,
//! environment sensor, fixed limit switches and a recording bridge.

use std::cell::RefCell;
use std::rc::Rc;

use tracker_traits::clock::test_clock::TestClock;
use tracker_traits::{
    ButtonInput, EnvironmentSensor, HBridge, HwResult, LimitSwitches, PowerManager, WakeCause,
};

use crate::error::HwError;

/// Button driven by a list of `[start_ms, end_ms)` press windows.
#[derive(Debug, Clone)]
pub struct ScriptedButton {
    clock: TestClock,
    presses: Vec<(u64, u64)>,
    active_high: bool,
}

impl ScriptedButton {
    pub fn new(clock: TestClock, active_high: bool) -> Self {
        Self {
            clock,
            presses: Vec::new(),
            active_high,
        }
    }

    /// Hold the button from `at_ms` for `hold_ms`.
    pub fn press(mut self, at_ms: u64, hold_ms: u64) -> Self {
        self.presses.push((at_ms, at_ms.saturating_add(hold_ms)));
        self
    }

    pub fn is_pressed_at(&self, t_ms: u64) -> bool {
        self.presses
            .iter()
            .any(|&(start, end)| (start..end).contains(&t_ms))
    }
}

impl ButtonInput for ScriptedButton {
    fn read_level(&mut self) -> HwResult<bool> {
        let pressed = self.is_pressed_at(self.clock.elapsed_ms());
        Ok(pressed == self.active_high)
    }
}

/// One recorded low-power entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRecord {
    pub at_ms: u64,
    pub wake_after_ms: u64,
    pub wake_on_touch: bool,
}

/// Shared view of what the simulated power manager was asked to do.
pub type PowerLog = Rc<RefCell<Vec<SleepRecord>>>;

/// Power manager that "sleeps" by advancing the shared clock.
#[derive(Debug, Clone)]
pub struct SimPower {
    clock: TestClock,
    boot_cause: WakeCause,
    wake_cause: WakeCause,
    log: PowerLog,
}

impl SimPower {
    pub fn new(clock: TestClock) -> Self {
        Self {
            clock,
            boot_cause: WakeCause::PowerOn,
            wake_cause: WakeCause::Timer,
            log: Rc::default(),
        }
    }

    pub fn with_boot_cause(mut self, cause: WakeCause) -> Self {
        self.boot_cause = cause;
        self
    }

    /// Cause reported on every wake-up from sleep.
    pub fn with_wake_cause(mut self, cause: WakeCause) -> Self {
        self.wake_cause = cause;
        self
    }

    pub fn log(&self) -> PowerLog {
        Rc::clone(&self.log)
    }
}

impl PowerManager for SimPower {
    fn wake_cause(&mut self) -> WakeCause {
        self.boot_cause
    }

    fn enter_low_power(&mut self, wake_after_ms: u64, wake_on_touch: bool) -> HwResult<WakeCause> {
        let at_ms = self.clock.elapsed_ms();
        self.log.borrow_mut().push(SleepRecord {
            at_ms,
            wake_after_ms,
            wake_on_touch,
        });
        tracing::debug!(at_ms, wake_after_ms, wake_on_touch, "simulated sleep");
        self.clock.advance_ms(wake_after_ms);
        Ok(self.wake_cause)
    }
}

/// Temperature/humidity sensor with a slow deterministic drift and optional
/// failures every `fail_every` reads.
#[derive(Debug, Clone)]
pub struct SimEnvironment {
    temperature_c: f32,
    humidity_pct: f32,
    fail_every: Option<u32>,
    reads: u32,
}

impl SimEnvironment {
    pub fn new(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            temperature_c,
            humidity_pct,
            fail_every: None,
            reads: 0,
        }
    }

    pub fn failing_every(mut self, n: u32) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }
}

impl EnvironmentSensor for SimEnvironment {
    fn read(&mut self) -> HwResult<(f32, f32)> {
        self.reads = self.reads.wrapping_add(1);
        if let Some(n) = self.fail_every
            && self.reads % n == 0
        {
            return Err(Box::new(HwError::Checksum("dht frame")));
        }
        let wobble = ((self.reads % 5) as f32 - 2.0) * 0.1;
        Ok((self.temperature_c + wobble, self.humidity_pct - wobble))
    }
}

/// Limit switches stuck at fixed electrical levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLimits {
    pub level_a: bool,
    pub level_b: bool,
}

impl FixedLimits {
    /// Both switches open for the given polarity.
    pub fn open(active_high: bool) -> Self {
        Self {
            level_a: !active_high,
            level_b: !active_high,
        }
    }
}

impl LimitSwitches for FixedLimits {
    fn read_levels(&mut self) -> HwResult<(bool, bool)> {
        Ok((self.level_a, self.level_b))
    }
}

/// Bridge that keeps every write for later inspection.
pub type BridgeLog = Rc<RefCell<Vec<(u32, u32)>>>;

#[derive(Debug, Clone, Default)]
pub struct RecordingBridge {
    log: BridgeLog,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> BridgeLog {
        Rc::clone(&self.log)
    }
}

impl HBridge for RecordingBridge {
    fn write(&mut self, in1: u32, in2: u32) -> HwResult<()> {
        self.log.borrow_mut().push((in1, in2));
        Ok(())
    }
}
