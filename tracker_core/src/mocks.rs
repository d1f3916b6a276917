//! Test and helper mocks for tracker_core

use std::cell::RefCell;
use std::rc::Rc;

use tracker_traits::{HwResult, LightPair};

use crate::display::{DisplayFrame, DisplaySink};

/// A light pair that always errors; useful when feeding an axis with
/// externally obtained readings via `AxisUnit::sense_with`.
pub struct NoopLight;

impl LightPair for NoopLight {
    fn read(&mut self) -> HwResult<(u32, u32)> {
        Err(Box::new(std::io::Error::other("noop light pair")))
    }
}

/// Display sink that keeps every frame it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    frames: Rc<RefCell<Vec<DisplayFrame>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded frames.
    pub fn frames(&self) -> Rc<RefCell<Vec<DisplayFrame>>> {
        Rc::clone(&self.frames)
    }
}

impl DisplaySink for RecordingDisplay {
    fn push(&mut self, frame: &DisplayFrame) -> HwResult<()> {
        self.frames.borrow_mut().push(frame.clone());
        Ok(())
    }
}
