use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source for the tracker loop.
///
/// Control components never call this themselves; the runner converts
/// `now()` into a millisecond tick via `ms_since(epoch)` and passes it down.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Wall-clock backed monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_sleeps_for_real() {
        let clock = MonotonicClock::new();
        let epoch = clock.now();
        clock.sleep(Duration::ZERO);
        clock.sleep(Duration::from_millis(5));
        assert!(clock.ms_since(epoch) >= 5);
        // An epoch in the future saturates instead of wrapping.
        assert_eq!(clock.ms_since(epoch + Duration::from_secs(60)), 0);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic clock for tests and simulations.
    ///
    /// `sleep(d)` advances the shared offset instead of blocking, so a run of
    /// N ticks at 1 ms costs nothing in wall time. Clones share the offset.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset_ms: Arc<AtomicU64>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_ms: Arc::new(AtomicU64::new(0)),
            }
        }

        /// Advance the clock by `ms` milliseconds.
        pub fn advance_ms(&self, ms: u64) {
            let _ = self
                .offset_ms
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                    Some(v.saturating_add(ms))
                });
        }

        /// Jump to an absolute offset relative to the origin.
        pub fn set_ms(&self, ms: u64) {
            self.offset_ms.store(ms, Ordering::Relaxed);
        }

        /// Current offset in milliseconds.
        pub fn elapsed_ms(&self) -> u64 {
            self.offset_ms.load(Ordering::Relaxed)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + Duration::from_millis(self.elapsed_ms())
        }

        fn sleep(&self, d: Duration) {
            self.advance_ms(u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        }
    }

}
