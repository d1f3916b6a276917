//! Differential light sampling for one photoresistor pair.

use serde::Serialize;
use tracker_traits::LightPair;

use crate::config::SensorCfg;
use crate::util::{clamp_percent, period_due, samples_per_window};

/// One averaged differential reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LightSample {
    /// `(sum_a - sum_b) / (sum_a + sum_b) * 100`, always in [-100, 100].
    pub diff_percent: f32,
    pub avg_a: u32,
    pub avg_b: u32,
}

/// Signed differential offset of two channel sums in percent.
/// Both sums zero yields 0.
#[inline]
pub fn diff_percent(sum_a: u64, sum_b: u64) -> f32 {
    let total = sum_a.saturating_add(sum_b);
    if total == 0 {
        return 0.0;
    }
    let delta = sum_a as f64 - sum_b as f64;
    clamp_percent((delta / total as f64 * 100.0) as f32)
}

/// Accumulates raw reads at `read_ms` and publishes one `LightSample` per
/// averaging window.
#[derive(Debug, Clone)]
pub struct DifferentialLightSensor {
    cfg: SensorCfg,
    window: u32,
    last_read_ms: Option<u64>,
    sum_a: u64,
    sum_b: u64,
    count: u32,
    latest: Option<LightSample>,
    available: bool,
}

impl DifferentialLightSensor {
    pub fn new(cfg: SensorCfg) -> Self {
        let window = samples_per_window(cfg.read_ms, cfg.action_ms);
        Self {
            cfg,
            window,
            last_read_ms: None,
            sum_a: 0,
            sum_b: 0,
            count: 0,
            latest: None,
            available: false,
        }
    }

    /// Reads per published sample.
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Whether a raw read is due at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        period_due(self.last_read_ms, now_ms, self.cfg.read_ms)
    }

    /// Read `source` if due. Returns `Ok(true)` when a window completed.
    ///
    /// A failed read still consumes the read slot but adds nothing to the
    /// window; the error is returned for the caller to log.
    pub fn sample<L: LightPair + ?Sized>(
        &mut self,
        now_ms: u64,
        source: &mut L,
    ) -> tracker_traits::HwResult<bool> {
        if !self.is_due(now_ms) {
            return Ok(false);
        }
        self.last_read_ms = Some(now_ms);
        let (a, b) = source.read()?;
        Ok(self.accumulate(a, b))
    }

    /// Feed an already-taken reading, honoring the read period.
    /// Returns true when a window completed.
    pub fn push(&mut self, now_ms: u64, a: u32, b: u32) -> bool {
        if !self.is_due(now_ms) {
            return false;
        }
        self.last_read_ms = Some(now_ms);
        self.accumulate(a, b)
    }

    fn accumulate(&mut self, a: u32, b: u32) -> bool {
        self.sum_a = self.sum_a.saturating_add(u64::from(a));
        self.sum_b = self.sum_b.saturating_add(u64::from(b));
        self.count += 1;
        if self.count < self.window {
            return false;
        }

        let n = u64::from(self.count);
        let sample = LightSample {
            diff_percent: diff_percent(self.sum_a, self.sum_b),
            avg_a: u32::try_from(self.sum_a / n).unwrap_or(u32::MAX),
            avg_b: u32::try_from(self.sum_b / n).unwrap_or(u32::MAX),
        };
        self.sum_a = 0;
        self.sum_b = 0;
        self.count = 0;
        self.latest = Some(sample);
        self.available = true;
        true
    }

    /// Take the newest sample once; subsequent calls return `None` until the
    /// next window completes.
    pub fn consume(&mut self) -> Option<LightSample> {
        if !self.available {
            return None;
        }
        self.available = false;
        self.latest
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Newest sample regardless of consumption.
    pub fn latest(&self) -> Option<&LightSample> {
        self.latest.as_ref()
    }

    /// Reads accumulated in the current window.
    pub fn pending_reads(&self) -> u32 {
        self.count
    }
}
