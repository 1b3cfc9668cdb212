#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Reflectance line-sensor array driver (hardware-agnostic).
//!
//! All hardware access goes through the `qtr_traits::Hal` capability set, so
//! the driver runs unchanged against real GPIO or `qtr_hardware::SimulatedBoard`.
//!
//! ## Architecture
//!
//! - **Emitters**: odd/even bank sequencing, settle times, dimming (`emitters`)
//! - **Acquisition**: RC discharge timing and analog averaging (`acquisition`)
//! - **Reads**: emitter/acquisition composition per `ReadMode` (`sensors`)
//! - **Calibration**: outlier-resistant running min/max bounds (`calibration`)
//! - **Position**: 0..=1000 normalization and weighted centroid (`position`)
//!
//! ## Value ranges
//!
//! Raw readings are `u32`. RC readings are decay times in microseconds up to
//! the timeout; analog readings are averaged 10-bit samples. The
//! ambient-subtracting read modes return `on + max_value - off`, which can
//! exceed `max_value`.

pub mod acquisition;
pub mod builder;
pub mod calibration;
pub mod emitters;
pub mod error;
pub mod hw_error;
pub mod position;
pub mod sensors;
pub mod timing;
pub mod types;

pub use builder::QtrSensorsBuilder;
pub use calibration::{CalibrationBounds, combined_bound};
pub use emitters::EmitterConfig;
pub use error::{BuildError, QtrError, Report, Result};
pub use position::{LineEstimate, estimate_line, normalize};
pub use qtr_config::limits::MAX_SENSORS;
pub use sensors::QtrSensors;
pub use types::{CalibrationContext, Emitters, ReadMode, SensorType};
