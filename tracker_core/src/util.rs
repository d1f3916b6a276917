//! Small numeric and timing helpers shared by the control components.

/// Samples needed to complete one averaging window.
/// - `read_ms == 0` means "read every tick, publish every read".
/// - Never less than 1.
#[inline]
pub fn samples_per_window(read_ms: u64, window_ms: u64) -> u32 {
    if read_ms == 0 {
        return 1;
    }
    u32::try_from((window_ms / read_ms).max(1)).unwrap_or(u32::MAX)
}

/// True when a periodic action last run at `last` is due again at `now`.
/// A component that never ran is always due.
#[inline]
pub fn period_due(last: Option<u64>, now_ms: u64, period_ms: u64) -> bool {
    match last {
        None => true,
        Some(t) => now_ms.saturating_sub(t) >= period_ms,
    }
}

/// Clamp a signed normalized value into [-1, 1]; non-finite maps to 0.
#[inline]
pub fn clamp_norm(x: f32) -> f32 {
    if x.is_finite() { x.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Clamp a fraction into [0, 1]; non-finite maps to 0.
#[inline]
pub fn clamp_unit(x: f32) -> f32 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

/// Clamp a percentage into [-100, 100]; non-finite maps to 0.
#[inline]
pub fn clamp_percent(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(-100.0, 100.0)
    } else {
        0.0
    }
}

/// Absolute value of a configured percentage/threshold; non-finite maps to 0.
#[inline]
pub fn abs_or_zero(x: f32) -> f32 {
    if x.is_finite() { x.abs() } else { 0.0 }
}

/// Full-scale duty for a PWM resolution; bits are clamped to 1..=16.
#[inline]
pub fn pwm_range(res_bits: u8) -> u32 {
    let bits = u32::from(res_bits.clamp(1, 16));
    (1u32 << bits) - 1
}

/// Quantize a magnitude in [0, 1] to raw duty, rounding half away from zero.
#[inline]
pub fn quantize_duty(magnitude: f32, range: u32) -> u32 {
    let scaled = (clamp_unit(magnitude) * range as f32).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= range as f32 {
        range
    } else {
        scaled as u32
    }
}

/// Sign of a value as -1, 0 or +1.
#[inline]
pub fn sign_of(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
