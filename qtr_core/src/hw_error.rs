//! Maps `Box<dyn Error>` from trait boundaries to typed `QtrError`.
//!
//! The traits in `qtr_traits` use `Box<dyn Error + Send + Sync>` so any board
//! can plug in; this module converts those to our typed error enum, with an
//! optional feature-gated path for `qtr_hardware::HwError` downcasting.

use crate::error::QtrError;

/// Map a trait-boundary error to a typed `QtrError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> QtrError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<qtr_hardware::error::HwError>() {
            return match hw {
                qtr_hardware::error::HwError::PinUnavailable(_)
                | qtr_hardware::error::HwError::AnalogUnsupported => {
                    QtrError::HardwareFault(hw.to_string())
                }
                other => QtrError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("unsupported") {
        QtrError::HardwareFault(s)
    } else {
        QtrError::Hardware(s)
    }
}

/// Wrap a trait-boundary error into an `eyre::Report` carrying `QtrError`.
pub(crate) fn hw(e: qtr_traits::HalError) -> eyre::Report {
    eyre::Report::new(map_hw_error(e.as_ref()))
}
