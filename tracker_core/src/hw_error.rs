//! Maps `Box<dyn Error>` from trait boundaries to typed `TrackerError`.
//!
//! The traits in `tracker_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to the typed enum, with an optional feature-gated
//! path for `tracker_hardware::HwError` downcasting.

use crate::error::TrackerError;

/// Map a trait-boundary error to a typed `TrackerError`.
///
/// Known hardware error types are downcast first, then string heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TrackerError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<tracker_hardware::error::HwError>() {
            return match hw {
                tracker_hardware::error::HwError::Timeout => TrackerError::Timeout,
                other => TrackerError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TrackerError::Timeout
    } else {
        TrackerError::Hardware(s)
    }
}
