//! Level debouncer shared by the limit switches and the touch button.

/// Debounced view of one digital input, after polarity is applied.
///
/// A new raw level must hold for `debounce_ms` before it becomes the stable
/// level. Each accepted transition records one edge, consumed once.
#[derive(Debug, Clone)]
pub struct Debouncer {
    debounce_ms: u64,
    stable_pressed: bool,
    last_raw: bool,
    last_change_ms: Option<u64>,
    rising_edge_pending: bool,
    falling_edge_pending: bool,
}

impl Debouncer {
    /// `initial` is taken as already stable; a switch pressed at boot yields
    /// no edge.
    pub fn new(debounce_ms: u64, initial: bool) -> Self {
        Self {
            debounce_ms,
            stable_pressed: initial,
            last_raw: initial,
            last_change_ms: None,
            rising_edge_pending: false,
            falling_edge_pending: false,
        }
    }

    /// Feed the current level. Returns true when the stable level changed.
    pub fn update(&mut self, pressed: bool, now_ms: u64) -> bool {
        if pressed != self.last_raw {
            self.last_raw = pressed;
            self.last_change_ms = Some(now_ms);
        }
        if pressed == self.stable_pressed {
            return false;
        }
        let settled = self
            .last_change_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.debounce_ms);
        if !settled {
            return false;
        }
        self.stable_pressed = pressed;
        if pressed {
            self.rising_edge_pending = true;
        } else {
            self.falling_edge_pending = true;
        }
        true
    }

    /// Take `pressed` as the stable level and drop pending edges.
    pub fn reset(&mut self, pressed: bool) {
        *self = Self::new(self.debounce_ms, pressed);
    }

    pub fn is_pressed(&self) -> bool {
        self.stable_pressed
    }

    /// Most recent level fed in, settled or not.
    pub fn last_raw(&self) -> bool {
        self.last_raw
    }

    pub fn take_rising_edge(&mut self) -> bool {
        std::mem::take(&mut self.rising_edge_pending)
    }

    pub fn take_falling_edge(&mut self) -> bool {
        std::mem::take(&mut self.falling_edge_pending)
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }
}
