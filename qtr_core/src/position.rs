//! Calibrated readings and line position.
//!
//! Calibrated values run from 0 (at the calibrated minimum) to 1000 (at the
//! calibrated maximum). The line position is the calibrated-value weighted
//! centroid of the channel indices, scaled by 1000: 0 means the line is under
//! sensor 0, `(n - 1) * 1000` under the last sensor.

use qtr_traits::Hal;
use tracing::debug;

use crate::error::Result;
use crate::sensors::QtrSensors;
use crate::timing::{CALIBRATED_MAX, LINE_SEEN_THRESHOLD, NOISE_FLOOR};
use crate::types::{CalibrationContext, ReadMode};

/// Scale `raw` into `0..=1000` against `[calmin, calmax]`.
///
/// A range with `calmax <= calmin` carries no usable span and yields 0.
#[inline]
pub fn normalize(raw: u32, calmin: u32, calmax: u32) -> u32 {
    if calmax <= calmin {
        return 0;
    }
    let span = i64::from(calmax - calmin);
    let scaled = (i64::from(raw) - i64::from(calmin)) * i64::from(CALIBRATED_MAX) / span;
    scaled.clamp(0, i64::from(CALIBRATED_MAX)) as u32
}

/// Outcome of a centroid estimate over calibrated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEstimate {
    /// At least one channel saw the line; the weighted centroid.
    Seen(u32),
    /// Nothing above the detection threshold; the edge the line was last
    /// nearest to.
    Lost(u32),
}

impl LineEstimate {
    pub fn position(self) -> u32 {
        match self {
            LineEstimate::Seen(p) | LineEstimate::Lost(p) => p,
        }
    }
}

/// Weighted centroid of `values` (already calibrated), with `invert` for a
/// light line on a dark background.
///
/// Channels above 200 count as seeing the line; only channels above 50
/// contribute to the centroid. When nothing sees the line the result is 0 if
/// `last_position` was left of center and the right edge otherwise.
pub fn estimate_line(values: &[u32], invert: bool, last_position: u32) -> LineEstimate {
    if values.is_empty() {
        return LineEstimate::Lost(0);
    }
    let mut on_line = false;
    let mut weighted: u64 = 0;
    let mut sum: u64 = 0;

    for (i, &raw) in values.iter().enumerate() {
        let value = if invert {
            CALIBRATED_MAX.saturating_sub(raw)
        } else {
            raw
        };
        if value > LINE_SEEN_THRESHOLD {
            on_line = true;
        }
        if value > NOISE_FLOOR {
            weighted += u64::from(value) * (i as u64 * 1000);
            sum += u64::from(value);
        }
    }

    let right_edge = (values.len() as u32 - 1) * 1000;
    if !on_line {
        return if last_position < right_edge / 2 {
            LineEstimate::Lost(0)
        } else {
            LineEstimate::Lost(right_edge)
        };
    }
    LineEstimate::Seen((weighted / sum) as u32)
}

impl<H: Hal> QtrSensors<H> {
    /// Read and scale each channel to `0..=1000` using the calibration for
    /// `mode`.
    ///
    /// Leaves `values` untouched when `mode` is `Manual` or a calibration
    /// context the mode needs has not been initialized.
    pub fn read_calibrated(&mut self, values: &mut [u32], mode: ReadMode) -> Result<()> {
        self.check_buffer(values)?;
        if mode == ReadMode::Manual {
            debug!("calibrated reads need driver-controlled emitters; ignoring Manual");
            return Ok(());
        }
        if mode.uses_on_context() && !self.calibration_initialized(CalibrationContext::On) {
            debug!(?mode, "on calibration not initialized; ignoring read");
            return Ok(());
        }
        if mode.uses_off_context() && !self.calibration_initialized(CalibrationContext::Off) {
            debug!(?mode, "off calibration not initialized; ignoring read");
            return Ok(());
        }

        self.read(values, mode)?;

        let max_value = self.max_value;
        for (i, v) in values.iter_mut().take(self.sensor_count()).enumerate() {
            let (calmin, calmax) = self.calibration.range_for(mode, i, max_value);
            *v = normalize(*v, calmin, calmax);
        }
        Ok(())
    }

    /// Line position for a dark line on a light background.
    pub fn read_line_black(&mut self, values: &mut [u32], mode: ReadMode) -> Result<u32> {
        self.read_line(values, mode, false)
    }

    /// Line position for a light line on a dark background.
    pub fn read_line_white(&mut self, values: &mut [u32], mode: ReadMode) -> Result<u32> {
        self.read_line(values, mode, true)
    }

    /// Calibrated read followed by `estimate_line`; updates the last position
    /// when the line is seen. `Manual` returns the last position unchanged.
    pub fn read_line(&mut self, values: &mut [u32], mode: ReadMode, invert: bool) -> Result<u32> {
        self.check_buffer(values)?;
        if mode == ReadMode::Manual {
            debug!("line reads need driver-controlled emitters; ignoring Manual");
            return Ok(self.last_position);
        }
        self.read_calibrated(values, mode)?;

        let count = self.sensor_count();
        match estimate_line(&values[..count], invert, self.last_position) {
            LineEstimate::Seen(p) => {
                self.last_position = p;
                Ok(p)
            }
            LineEstimate::Lost(p) => Ok(p),
        }
    }
}
