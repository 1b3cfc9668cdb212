//! Settle times and pulse widths for the emitter driver and RC lines.
//!
//! Emitter driver minimums: 1 ms to turn off, 250 us to turn on. The values
//! below add margin on top of those.

/// Settle time after switching non-dimmable emitters.
pub const EMITTER_SETTLE_US: u32 = 200;
/// Off time for dimmable emitters; also the forced off time before
/// re-asserting an already-lit dimmable bank.
pub const DIMMABLE_OFF_US: u32 = 1200;
/// Minimum time since a dimmable bank was first driven high.
pub const DIMMABLE_ON_US: u32 = 300;
/// Width of each leg of a dimming pulse.
pub const DIMMING_PULSE_US: u32 = 1;
/// Poll interval while waiting out a settle time.
pub const SETTLE_POLL_US: u32 = 10;
/// Time RC lines are driven high before release.
pub const RC_CHARGE_US: u32 = 10;

/// Saturation value for analog readings (10-bit conversion).
pub const ANALOG_MAX_VALUE: u16 = 1023;
/// Acquisition passes folded into each calibration call.
pub const CALIBRATION_PASSES: usize = 10;

/// Calibrated readings span `0..=CALIBRATED_MAX`.
pub const CALIBRATED_MAX: u32 = 1000;
/// A calibrated channel above this means the line is in view.
pub const LINE_SEEN_THRESHOLD: u32 = 200;
/// Calibrated channels at or below this are ignored by the centroid.
pub const NOISE_FLOOR: u32 = 50;
