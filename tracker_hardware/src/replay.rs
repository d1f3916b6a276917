//! Light source that replays a recorded trace against the shared clock.

use std::rc::Rc;

use tracker_traits::clock::test_clock::TestClock;
use tracker_traits::{HwResult, LightPair};

/// Replays `(t_ms, a, b)` rows: a read at time `t` returns the newest row
/// with `t_ms <= t` (the first row before the trace starts).
#[derive(Debug, Clone)]
pub struct ReplayLightPair {
    clock: TestClock,
    rows: Rc<[(u64, u32, u32)]>,
    idx: usize,
}

impl ReplayLightPair {
    pub fn new(clock: TestClock, rows: impl Into<Rc<[(u64, u32, u32)]>>) -> Self {
        Self {
            clock,
            rows: rows.into(),
            idx: 0,
        }
    }

    /// Timestamp of the last row, if any.
    pub fn end_ms(&self) -> Option<u64> {
        self.rows.last().map(|r| r.0)
    }
}

impl LightPair for ReplayLightPair {
    fn read(&mut self) -> HwResult<(u32, u32)> {
        let now = self.clock.elapsed_ms();
        while self.idx + 1 < self.rows.len() && self.rows[self.idx + 1].0 <= now {
            self.idx += 1;
        }
        match self.rows.get(self.idx) {
            Some(&(_, a, b)) => Ok((a, b)),
            None => Err("light trace is empty".into()),
        }
    }
}
