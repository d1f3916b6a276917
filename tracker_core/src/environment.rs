//! Temperature/humidity window averaging.

use serde::Serialize;
use tracker_traits::EnvironmentSensor;

use crate::config::EnvironmentCfg;
use crate::util::period_due;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EnvironmentSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Reads every `report_ms / samples` and publishes the mean of `samples`
/// valid readings.
#[derive(Debug, Clone)]
pub struct EnvironmentSampler {
    samples: u32,
    interval_ms: u64,
    last_read_ms: Option<u64>,
    sum_t: f64,
    sum_h: f64,
    count: u32,
    latest: Option<EnvironmentSample>,
    available: bool,
}

impl EnvironmentSampler {
    pub fn new(cfg: &EnvironmentCfg) -> Self {
        let samples = cfg.samples.max(1);
        let interval_ms = if samples == 1 {
            cfg.report_ms
        } else {
            (cfg.report_ms / u64::from(samples)).max(1)
        };
        Self {
            samples,
            interval_ms,
            last_read_ms: None,
            sum_t: 0.0,
            sum_h: 0.0,
            count: 0,
            latest: None,
            available: false,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Read `sensor` if due. Returns true when a report was published.
    pub fn sample<E: EnvironmentSensor + ?Sized>(&mut self, now_ms: u64, sensor: &mut E) -> bool {
        if !period_due(self.last_read_ms, now_ms, self.interval_ms) {
            return false;
        }
        self.last_read_ms = Some(now_ms);
        match sensor.read() {
            Ok((t, h)) => self.push(t, h),
            Err(e) => {
                tracing::debug!(error = %e, "environment read discarded");
                false
            }
        }
    }

    /// Add one reading; non-finite values are dropped without progress.
    pub fn push(&mut self, temperature_c: f32, humidity_pct: f32) -> bool {
        if !temperature_c.is_finite() || !humidity_pct.is_finite() {
            tracing::debug!("environment reading not finite, discarded");
            return false;
        }
        self.sum_t += f64::from(temperature_c);
        self.sum_h += f64::from(humidity_pct);
        self.count += 1;
        if self.count < self.samples {
            return false;
        }
        let n = f64::from(self.count);
        let sample = EnvironmentSample {
            temperature_c: (self.sum_t / n) as f32,
            humidity_pct: (self.sum_h / n) as f32,
        };
        self.sum_t = 0.0;
        self.sum_h = 0.0;
        self.count = 0;
        self.latest = Some(sample);
        self.available = true;
        tracing::debug!(
            temperature_c = sample.temperature_c,
            humidity_pct = sample.humidity_pct,
            "environment report"
        );
        true
    }

    pub fn consume(&mut self) -> Option<EnvironmentSample> {
        if !std::mem::take(&mut self.available) {
            return None;
        }
        self.latest
    }

    pub fn latest(&self) -> Option<&EnvironmentSample> {
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_follows_report_and_samples() {
        let s = EnvironmentSampler::new(&EnvironmentCfg {
            report_ms: 20_000,
            samples: 5,
        });
        assert_eq!(s.interval_ms(), 4_000);
        let one = EnvironmentSampler::new(&EnvironmentCfg {
            report_ms: 700,
            samples: 1,
        });
        assert_eq!(one.interval_ms(), 700);
        let tiny = EnvironmentSampler::new(&EnvironmentCfg {
            report_ms: 2,
            samples: 5,
        });
        assert_eq!(tiny.interval_ms(), 1);
    }

    #[test]
    fn nan_does_not_progress_window() {
        let mut s = EnvironmentSampler::new(&EnvironmentCfg {
            report_ms: 10,
            samples: 2,
        });
        assert!(!s.push(20.0, 40.0));
        assert!(!s.push(f32::NAN, 40.0));
        assert!(s.push(22.0, 50.0));
        let report = s.consume().unwrap();
        assert_eq!(report.temperature_c, 21.0);
        assert_eq!(report.humidity_pct, 45.0);
        assert!(s.consume().is_none());
    }
}
