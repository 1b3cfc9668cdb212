//! Running per-channel calibration bounds.
//!
//! Each calibration call folds a batch of readings into the stored bounds. A
//! bound only moves when the whole batch agrees: the maximum rises only if
//! the batch *minimum* exceeds it, the minimum falls only if the batch
//! *maximum* is below it. A single spike inside a batch never moves a bound.

use qtr_config::limits::MAX_SENSORS;
use tracing::warn;

use crate::types::{CalibrationContext, ReadMode};

/// Minimum/maximum raw reading per channel for one emitter context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalibrationBounds {
    minimum: Vec<u32>,
    maximum: Vec<u32>,
    initialized: bool,
}

impl CalibrationBounds {
    pub fn minimum(&self) -> &[u32] {
        &self.minimum
    }

    pub fn maximum(&self) -> &[u32] {
        &self.maximum
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// (Re)allocate for `count` channels with the "no data" bounds
    /// (minimum = `max_value`, maximum = 0).
    ///
    /// On allocation failure the old storage is freed, the set stays
    /// uninitialized and `false` is returned.
    pub(crate) fn initialize(&mut self, count: usize, max_value: u16) -> bool {
        self.initialized = false;
        self.minimum.clear();
        self.maximum.clear();
        if self.minimum.try_reserve_exact(count).is_err()
            || self.maximum.try_reserve_exact(count).is_err()
        {
            self.minimum = Vec::new();
            self.maximum = Vec::new();
            warn!(count, "calibration bound allocation failed");
            return false;
        }
        self.minimum.resize(count, u32::from(max_value));
        self.maximum.resize(count, 0);
        self.initialized = true;
        true
    }

    /// Restore the "no data" bounds without touching the initialized flag.
    pub(crate) fn reset(&mut self, max_value: u16) {
        self.minimum.fill(u32::from(max_value));
        self.maximum.fill(0);
    }

    pub(crate) fn invalidate(&mut self) {
        self.initialized = false;
    }

    /// Fold one batch's per-channel extremes into the stored bounds.
    pub(crate) fn fold_batch(&mut self, batch: &BatchExtremes) {
        let n = self.maximum.len().min(batch.count);
        for i in 0..n {
            if batch.min[i] > self.maximum[i] {
                self.maximum[i] = batch.min[i];
            }
            if batch.max[i] < self.minimum[i] {
                self.minimum[i] = batch.max[i];
            }
        }
    }
}

/// Per-channel extremes across the passes of one calibration batch.
#[derive(Debug, Clone)]
pub(crate) struct BatchExtremes {
    min: [u32; MAX_SENSORS],
    max: [u32; MAX_SENSORS],
    count: usize,
    passes: usize,
}

impl BatchExtremes {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            min: [0; MAX_SENSORS],
            max: [0; MAX_SENSORS],
            count: count.min(MAX_SENSORS),
            passes: 0,
        }
    }

    pub(crate) fn observe(&mut self, values: &[u32]) {
        let first = self.passes == 0;
        for (i, &v) in values.iter().take(self.count).enumerate() {
            if first || v > self.max[i] {
                self.max[i] = v;
            }
            if first || v < self.min[i] {
                self.min[i] = v;
            }
        }
        self.passes += 1;
    }

    #[cfg(test)]
    pub(crate) fn extremes(&self, i: usize) -> (u32, u32) {
        (self.min[i], self.max[i])
    }
}

/// Bound used when combining on and off calibration for the
/// ambient-subtracting modes: `on + max_value - off`, or `max_value` when the
/// off bound is below the on bound (no meaningful signal).
#[inline]
pub fn combined_bound(on: u32, off: u32, max_value: u32) -> u32 {
    if off < on {
        max_value
    } else {
        on + max_value - off
    }
}

/// The On and Off bound sets.
#[derive(Debug, Clone, Default)]
pub struct CalibrationTable {
    sets: [CalibrationBounds; 2],
}

impl CalibrationTable {
    pub fn bounds(&self, ctx: CalibrationContext) -> &CalibrationBounds {
        &self.sets[ctx.index()]
    }

    pub(crate) fn bounds_mut(&mut self, ctx: CalibrationContext) -> &mut CalibrationBounds {
        &mut self.sets[ctx.index()]
    }

    /// Both sets become uninitialized; storage is reallocated on the next
    /// calibration of each context.
    pub(crate) fn invalidate_all(&mut self) {
        for set in &mut self.sets {
            set.invalidate();
        }
    }

    pub(crate) fn reset_all(&mut self, max_value: u16) {
        for set in &mut self.sets {
            set.reset(max_value);
        }
    }

    /// `(calmin, calmax)` for channel `i` under `mode`. The caller has
    /// already checked that the required contexts are initialized.
    pub(crate) fn range_for(&self, mode: ReadMode, i: usize, max_value: u16) -> (u32, u32) {
        let on = self.bounds(CalibrationContext::On);
        let off = self.bounds(CalibrationContext::Off);
        match mode {
            ReadMode::Off => (off.minimum[i], off.maximum[i]),
            ReadMode::OnAndOff | ReadMode::OddEvenAndOff => {
                let max = u32::from(max_value);
                (
                    combined_bound(on.minimum[i], off.minimum[i], max),
                    combined_bound(on.maximum[i], off.maximum[i], max),
                )
            }
            _ => (on.minimum[i], on.maximum[i]),
        }
    }
}
