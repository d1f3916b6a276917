//! Hardware seams for the tracker control stack.
//!
//! Everything the core touches on the outside goes through one of these
//! traits. Errors cross the boundary boxed; `tracker_core::hw_error` maps them
//! back to typed errors.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error type used at every hardware boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// One photoresistor pair: raw intensity of channel A and channel B.
pub trait LightPair {
    fn read(&mut self) -> HwResult<(u32, u32)>;
}

/// Two-input H-bridge. At most one input carries a nonzero duty.
pub trait HBridge {
    fn write(&mut self, in1: u32, in2: u32) -> HwResult<()>;
}

/// Raw electrical levels of the two travel limit switches (before polarity).
pub trait LimitSwitches {
    fn read_levels(&mut self) -> HwResult<(bool, bool)>;
}

/// Raw electrical level of the mode/touch button (before polarity).
pub trait ButtonInput {
    fn read_level(&mut self) -> HwResult<bool>;
}

/// Temperature (°C) and relative humidity (%) sensor.
pub trait EnvironmentSensor {
    fn read(&mut self) -> HwResult<(f32, f32)>;
}

/// Why the device is running: read back once at boot and after each sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// Periodic wake timer fired.
    Timer,
    /// Touch input (or another external source) woke the device.
    External,
    /// Cold boot / reset, no sleep involved.
    PowerOn,
}

/// Platform low-power control.
pub trait PowerManager {
    /// Wake cause for the current boot.
    fn wake_cause(&mut self) -> WakeCause;

    /// Enter low power. Wakes after `wake_after_ms` or on touch when
    /// `wake_on_touch` is set. Platforms that reset on wake never return;
    /// simulated ones return the cause.
    fn enter_low_power(&mut self, wake_after_ms: u64, wake_on_touch: bool) -> HwResult<WakeCause>;
}

impl<T: LightPair + ?Sized> LightPair for Box<T> {
    fn read(&mut self) -> HwResult<(u32, u32)> {
        (**self).read()
    }
}

impl<T: HBridge + ?Sized> HBridge for Box<T> {
    fn write(&mut self, in1: u32, in2: u32) -> HwResult<()> {
        (**self).write(in1, in2)
    }
}

impl<T: LimitSwitches + ?Sized> LimitSwitches for Box<T> {
    fn read_levels(&mut self) -> HwResult<(bool, bool)> {
        (**self).read_levels()
    }
}

impl<T: ButtonInput + ?Sized> ButtonInput for Box<T> {
    fn read_level(&mut self) -> HwResult<bool> {
        (**self).read_level()
    }
}

impl<T: EnvironmentSensor + ?Sized> EnvironmentSensor for Box<T> {
    fn read(&mut self) -> HwResult<(f32, f32)> {
        (**self).read()
    }
}

impl<T: PowerManager + ?Sized> PowerManager for Box<T> {
    fn wake_cause(&mut self) -> WakeCause {
        (**self).wake_cause()
    }

    fn enter_low_power(&mut self, wake_after_ms: u64, wake_on_touch: bool) -> HwResult<WakeCause> {
        (**self).enter_low_power(wake_after_ms, wake_on_touch)
    }
}
