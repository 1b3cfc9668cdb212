//! The sensor array driver: configuration, read orchestration and calibration.

use qtr_config::limits::{
    DEFAULT_SAMPLES_PER_SENSOR, DEFAULT_TIMEOUT_US, MAX_DIMMING_LEVEL, MAX_SAMPLES_PER_SENSOR,
    MAX_SENSORS,
};
use qtr_traits::{Hal, Pin};
use tracing::{debug, trace, warn};

use crate::calibration::{BatchExtremes, CalibrationBounds, CalibrationTable};
use crate::emitters::EmitterConfig;
use crate::error::{QtrError, Result};
use crate::timing::{ANALOG_MAX_VALUE, CALIBRATION_PASSES};
use crate::types::{CalibrationContext, Emitters, ReadMode, SensorType};

/// Driver for an array of QTR-style reflectance sensors.
///
/// Not reentrant: every operation runs to completion on the calling thread,
/// and concurrent use of one instance must be serialized by the caller.
pub struct QtrSensors<H: Hal> {
    pub(crate) hal: H,
    pub(crate) sensor_type: Option<SensorType>,
    pub(crate) sensor_pins: Vec<Pin>,
    pub(crate) timeout: u16,
    pub(crate) max_value: u16,
    pub(crate) samples_per_sensor: u8,
    pub(crate) emitters: EmitterConfig,
    pub(crate) calibration: CalibrationTable,
    pub(crate) last_position: u32,
}

impl<H: Hal> core::fmt::Debug for QtrSensors<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QtrSensors")
            .field("sensor_type", &self.sensor_type)
            .field("sensor_pins", &self.sensor_pins)
            .field("max_value", &self.max_value)
            .field("emitters", &self.emitters)
            .field("last_position", &self.last_position)
            .finish_non_exhaustive()
    }
}

impl<H: Hal> QtrSensors<H> {
    /// A driver with no sensing type and no pins; reads are no-ops until
    /// both are configured.
    pub fn new(hal: H) -> Self {
        Self {
            hal,
            sensor_type: None,
            sensor_pins: Vec::new(),
            timeout: DEFAULT_TIMEOUT_US,
            max_value: DEFAULT_TIMEOUT_US,
            samples_per_sensor: DEFAULT_SAMPLES_PER_SENSOR,
            emitters: EmitterConfig::default(),
            calibration: CalibrationTable::default(),
            last_position: 0,
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    // ── Configuration ───────────────────────────────────────────────────────

    pub fn set_type_rc(&mut self) {
        self.sensor_type = Some(SensorType::Rc);
        self.max_value = self.timeout;
    }

    pub fn set_type_analog(&mut self) {
        self.sensor_type = Some(SensorType::Analog);
        self.max_value = ANALOG_MAX_VALUE;
    }

    pub fn set_type(&mut self, sensor_type: SensorType) {
        match sensor_type {
            SensorType::Rc => self.set_type_rc(),
            SensorType::Analog => self.set_type_analog(),
        }
    }

    /// Replace the sensor pin list (at most `MAX_SENSORS`; extra pins are
    /// ignored). Invalidates both calibration contexts.
    ///
    /// If the pin list cannot be allocated the array ends up empty, which
    /// turns every read into a no-op.
    pub fn set_sensor_pins(&mut self, pins: &[Pin]) {
        let count = pins.len().min(MAX_SENSORS);
        let mut next = Vec::new();
        if let Err(e) = next.try_reserve_exact(count) {
            warn!(count, error = %e, "sensor pin allocation failed; array disabled");
            self.sensor_pins = Vec::new();
            self.calibration.invalidate_all();
            return;
        }
        next.extend_from_slice(&pins[..count]);
        self.sensor_pins = next;
        self.calibration.invalidate_all();
        debug!(count, "sensor pins configured; calibration invalidated");
    }

    /// RC timeout in microseconds; becomes the max value in RC mode.
    pub fn set_timeout(&mut self, timeout: u16) {
        self.timeout = timeout;
        if self.sensor_type == Some(SensorType::Rc) {
            self.max_value = timeout;
        }
    }

    /// Analog conversions averaged per channel, clamped to `1..=64`.
    pub fn set_samples_per_sensor(&mut self, samples: u8) {
        self.samples_per_sensor = samples.clamp(1, MAX_SAMPLES_PER_SENSOR);
    }

    /// Dimming pulses applied when turning dimmable emitters on, clamped to 31.
    pub fn set_dimming_level(&mut self, level: u8) {
        self.emitters.dimming_level = level.min(MAX_DIMMING_LEVEL);
    }

    pub fn set_dimmable(&mut self) {
        self.emitters.dimmable = true;
    }

    pub fn set_non_dimmable(&mut self) {
        self.emitters.dimmable = false;
    }

    // ── Getters ─────────────────────────────────────────────────────────────

    pub fn sensor_type(&self) -> Option<SensorType> {
        self.sensor_type
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_pins.len()
    }

    pub fn sensor_pins(&self) -> &[Pin] {
        &self.sensor_pins
    }

    pub fn timeout(&self) -> u16 {
        self.timeout
    }

    pub fn samples_per_sensor(&self) -> u8 {
        self.samples_per_sensor
    }

    /// Saturation ceiling of raw readings: the timeout (RC) or 1023 (analog).
    pub fn max_value(&self) -> u16 {
        self.max_value
    }

    pub fn emitter_pin_count(&self) -> u8 {
        self.emitters.pin_count()
    }

    pub fn odd_emitter_pin(&self) -> Option<Pin> {
        self.emitters.odd
    }

    pub fn even_emitter_pin(&self) -> Option<Pin> {
        self.emitters.even
    }

    pub fn dimmable(&self) -> bool {
        self.emitters.dimmable
    }

    pub fn dimming_level(&self) -> u8 {
        self.emitters.dimming_level
    }

    /// Position returned by the last estimate that saw the line.
    pub fn last_position(&self) -> u32 {
        self.last_position
    }

    pub fn calibration(&self, ctx: CalibrationContext) -> &CalibrationBounds {
        self.calibration.bounds(ctx)
    }

    pub fn calibration_initialized(&self, ctx: CalibrationContext) -> bool {
        self.calibration.bounds(ctx).is_initialized()
    }

    pub(crate) fn check_buffer(&self, values: &[u32]) -> Result<()> {
        let needed = self.sensor_count();
        if values.len() < needed {
            return Err(eyre::Report::new(QtrError::BufferTooSmall {
                needed,
                got: values.len(),
            }));
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    /// Read raw values into `values[..sensor_count]` using `mode`'s emitter
    /// sequencing.
    ///
    /// In the ambient-subtracting modes each value is `on + max_value - off`,
    /// which can exceed `max_value`.
    pub fn read(&mut self, values: &mut [u32], mode: ReadMode) -> Result<()> {
        self.check_buffer(values)?;
        match mode {
            ReadMode::Off => {
                self.emitters_off(Emitters::All, true)?;
                return self.read_private(values, 0, 1);
            }
            ReadMode::Manual => return self.read_private(values, 0, 1),
            ReadMode::On | ReadMode::OnAndOff => {
                self.emitters_on(Emitters::All, true)?;
                self.read_private(values, 0, 1)?;
                self.emitters_off(Emitters::All, true)?;
            }
            ReadMode::OddEven | ReadMode::OddEvenAndOff => {
                // Index 0 is sensor 1, so start = 0 reads the odd-numbered
                // sensors and start = 1 the even-numbered ones.
                self.emitters_select(Emitters::Odd)?;
                self.read_private(values, 0, 2)?;
                self.emitters_select(Emitters::Even)?;
                self.read_private(values, 1, 2)?;
                self.emitters_off(Emitters::All, true)?;
            }
        }

        if mode.combines_off() {
            let count = self.sensor_count();
            let mut off = [0u32; MAX_SENSORS];
            self.read_private(&mut off[..count], 0, 1)?;
            let max = u32::from(self.max_value);
            for (v, off) in values.iter_mut().zip(&off[..count]) {
                *v = (*v + max).saturating_sub(*off);
            }
        }
        Ok(())
    }

    /// `read` with a raw mode selector; unknown selectors are a no-op.
    pub fn read_by_index(&mut self, values: &mut [u32], mode: u8) -> Result<()> {
        match ReadMode::from_index(mode) {
            Some(mode) => self.read(values, mode),
            None => {
                debug!(mode, "unknown read mode; ignoring");
                Ok(())
            }
        }
    }

    // ── Calibration ─────────────────────────────────────────────────────────

    /// Take one batch of calibration readings for the contexts `mode` uses.
    ///
    /// `On`/`OddEven` calibrate the on context, `Off` the off context, and the
    /// ambient-subtracting modes both. `Manual` is ignored.
    pub fn calibrate(&mut self, mode: ReadMode) -> Result<()> {
        match mode {
            ReadMode::Manual => {
                debug!("calibration needs driver-controlled emitters; ignoring Manual");
                return Ok(());
            }
            ReadMode::On | ReadMode::OnAndOff => {
                self.calibrate_context(CalibrationContext::On, ReadMode::On)?;
            }
            ReadMode::OddEven | ReadMode::OddEvenAndOff => {
                self.calibrate_context(CalibrationContext::On, ReadMode::OddEven)?;
            }
            ReadMode::Off => {}
        }
        if mode.uses_off_context() {
            self.calibrate_context(CalibrationContext::Off, ReadMode::Off)?;
        }
        Ok(())
    }

    /// Restore both contexts to the "no data" bounds, keeping their
    /// initialized flags.
    pub fn reset_calibration(&mut self) {
        self.calibration.reset_all(self.max_value);
    }

    fn calibrate_context(&mut self, ctx: CalibrationContext, mode: ReadMode) -> Result<()> {
        let count = self.sensor_count();
        let max_value = self.max_value;
        let bounds = self.calibration.bounds_mut(ctx);
        if !bounds.is_initialized() && !bounds.initialize(count, max_value) {
            return Ok(());
        }

        let mut values = [0u32; MAX_SENSORS];
        let mut batch = BatchExtremes::new(count);
        for _ in 0..CALIBRATION_PASSES {
            self.read(&mut values[..count], mode)?;
            batch.observe(&values[..count]);
        }
        trace!(?ctx, ?mode, values = ?&values[..count], "calibration batch done");

        self.calibration.bounds_mut(ctx).fold_batch(&batch);
        Ok(())
    }
}

impl<H: Hal> Drop for QtrSensors<H> {
    fn drop(&mut self) {
        if let Err(e) = self.release_emitter_pins() {
            warn!(error = %e, "release_emitter_pins failed on drop");
        }
    }
}
