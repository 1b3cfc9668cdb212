//! Builder for `QtrSensors` and construction from a `qtr_config::Config`.
//!
//! `try_build()` validates everything up front, then applies the settings
//! through the same setters a caller would use, in the order the driver
//! expects (timeout before type, emitters last).

use qtr_config::limits::{MAX_DIMMING_LEVEL, MAX_SAMPLES_PER_SENSOR, MAX_SENSORS};
use qtr_traits::{Hal, Pin};

use crate::error::{BuildError, QtrError, Result};
use crate::sensors::QtrSensors;
use crate::types::SensorType;

/// Builder for `QtrSensors`. All fields are validated on `try_build()`.
#[derive(Debug, Clone, Default)]
pub struct QtrSensorsBuilder {
    sensor_type: Option<SensorType>,
    pins: Option<Vec<Pin>>,
    timeout_us: Option<u16>,
    samples_per_sensor: Option<u8>,
    odd_emitter: Option<Pin>,
    even_emitter: Option<Pin>,
    dimmable: Option<bool>,
    dimming_level: Option<u8>,
}

impl<H: Hal> QtrSensors<H> {
    /// Validate `cfg` and build a driver from it.
    pub fn from_config(cfg: &qtr_config::Config, hal: H) -> Result<Self> {
        cfg.validate()
            .map_err(|e| eyre::Report::new(QtrError::Config(format!("{e:#}"))))?;
        let mut b = QtrSensorsBuilder::new()
            .sensor_type(cfg.sensors.kind.into())
            .pins(&cfg.sensors.pins)
            .timeout_us(cfg.sensors.timeout_us)
            .samples_per_sensor(cfg.sensors.samples_per_sensor)
            .dimmable(cfg.emitters.dimmable)
            .dimming_level(cfg.emitters.dimming_level);
        b = match (cfg.emitters.odd_pin, cfg.emitters.even_pin) {
            (Some(odd), Some(even)) => b.emitter_pins(odd, even),
            (Some(pin), None) => b.emitter_pin(pin),
            _ => b,
        };
        b.try_build(hal)
    }
}

impl QtrSensorsBuilder {
    /// Start building a driver.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensor_type(mut self, t: SensorType) -> Self {
        self.sensor_type = Some(t);
        self
    }

    pub fn rc(self) -> Self {
        self.sensor_type(SensorType::Rc)
    }

    pub fn analog(self) -> Self {
        self.sensor_type(SensorType::Analog)
    }

    pub fn pins(mut self, pins: &[Pin]) -> Self {
        self.pins = Some(pins.to_vec());
        self
    }

    pub fn timeout_us(mut self, timeout: u16) -> Self {
        self.timeout_us = Some(timeout);
        self
    }

    pub fn samples_per_sensor(mut self, samples: u8) -> Self {
        self.samples_per_sensor = Some(samples);
        self
    }

    /// Single emitter pin for the whole array.
    pub fn emitter_pin(mut self, pin: Pin) -> Self {
        self.odd_emitter = Some(pin);
        self.even_emitter = None;
        self
    }

    /// Separate odd/even emitter banks.
    pub fn emitter_pins(mut self, odd: Pin, even: Pin) -> Self {
        self.odd_emitter = Some(odd);
        self.even_emitter = Some(even);
        self
    }

    pub fn dimmable(mut self, dimmable: bool) -> Self {
        self.dimmable = Some(dimmable);
        self
    }

    pub fn dimming_level(mut self, level: u8) -> Self {
        self.dimming_level = Some(level);
        self
    }

    /// Validate and construct the driver around `hal`.
    pub fn try_build<H: Hal>(self, hal: H) -> Result<QtrSensors<H>> {
        let sensor_type = self
            .sensor_type
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensorType))?;
        let pins = self
            .pins
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensorPins))?;

        // ── Validation ───────────────────────────────────────────────────────
        if pins.is_empty() {
            return Err(eyre::Report::new(BuildError::MissingSensorPins));
        }
        if pins.len() > MAX_SENSORS {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "too many sensor pins",
            )));
        }
        if self.timeout_us == Some(0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "timeout_us must be >= 1",
            )));
        }
        if let Some(s) = self.samples_per_sensor
            && (s == 0 || s > MAX_SAMPLES_PER_SENSOR)
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "samples_per_sensor must be in [1, 64]",
            )));
        }
        if self.dimming_level.is_some_and(|l| l > MAX_DIMMING_LEVEL) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "dimming_level must be in [0, 31]",
            )));
        }
        let emitter_pins = [self.odd_emitter, self.even_emitter];
        if emitter_pins.iter().flatten().any(|p| pins.contains(p)) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "emitter pin overlaps a sensor pin",
            )));
        }
        if self.odd_emitter.is_some() && self.odd_emitter == self.even_emitter {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "odd and even emitter pins must differ",
            )));
        }

        // ── Construction ─────────────────────────────────────────────────────
        let mut sensors = QtrSensors::new(hal);
        if let Some(t) = self.timeout_us {
            sensors.set_timeout(t);
        }
        sensors.set_type(sensor_type);
        sensors.set_sensor_pins(&pins);
        if let Some(s) = self.samples_per_sensor {
            sensors.set_samples_per_sensor(s);
        }
        match self.dimmable {
            Some(false) => sensors.set_non_dimmable(),
            Some(true) => sensors.set_dimmable(),
            None => {}
        }
        if let Some(l) = self.dimming_level {
            sensors.set_dimming_level(l);
        }
        match (self.odd_emitter, self.even_emitter) {
            (Some(odd), Some(even)) => sensors.set_emitter_pins(odd, even)?,
            (Some(pin), None) => sensors.set_emitter_pin(pin)?,
            _ => {}
        }
        Ok(sensors)
    }
}
