#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for a reflectance sensor array.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Limits shared with the driver live in `limits`.
//!
//! Example:
//! ```toml
//! [sensors]
//! type = "rc"
//! pins = [3, 4, 5, 6, 7, 8]
//! timeout_us = 2500
//!
//! [emitters]
//! odd_pin = 2
//! dimmable = true
//! dimming_level = 0
//! ```
use std::collections::HashSet;
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;

pub mod limits {
    /// Maximum number of sensor channels on one array.
    pub const MAX_SENSORS: usize = 31;
    /// Upper bound for analog samples averaged per channel.
    pub const MAX_SAMPLES_PER_SENSOR: u8 = 64;
    /// Upper bound for emitter dimming pulses.
    pub const MAX_DIMMING_LEVEL: u8 = 31;
    /// Default RC timeout in microseconds.
    pub const DEFAULT_TIMEOUT_US: u16 = 2500;
    /// Default analog samples per channel.
    pub const DEFAULT_SAMPLES_PER_SENSOR: u8 = 4;
}

use limits::*;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Charge/discharge timing.
    Rc,
    /// Direct analog voltage.
    Analog,
}

#[derive(Debug, Deserialize)]
pub struct SensorsCfg {
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub pins: Vec<u8>,
    /// RC discharge timeout (us); the saturation value for RC readings.
    #[serde(default = "default_timeout_us")]
    pub timeout_us: u16,
    /// Analog conversions averaged per channel per read.
    #[serde(default = "default_samples_per_sensor")]
    pub samples_per_sensor: u8,
}

fn default_timeout_us() -> u16 {
    DEFAULT_TIMEOUT_US
}

fn default_samples_per_sensor() -> u8 {
    DEFAULT_SAMPLES_PER_SENSOR
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmittersCfg {
    /// Single emitter pin, or the odd bank when `even_pin` is also set.
    pub odd_pin: Option<u8>,
    pub even_pin: Option<u8>,
    pub dimmable: bool,
    /// Dimming pulses applied when turning emitters on (0 = full brightness).
    pub dimming_level: u8,
}

impl Default for EmittersCfg {
    fn default() -> Self {
        Self {
            odd_pin: None,
            even_pin: None,
            dimmable: true,
            dimming_level: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sensors: SensorsCfg,
    #[serde(default)]
    pub emitters: EmittersCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_path(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensors
        let pins = &self.sensors.pins;
        if pins.is_empty() {
            eyre::bail!("sensors.pins must list at least one pin");
        }
        if pins.len() > MAX_SENSORS {
            eyre::bail!(
                "sensors.pins lists {} pins; at most {MAX_SENSORS} are supported",
                pins.len()
            );
        }
        let mut seen = HashSet::new();
        for pin in pins {
            if !seen.insert(*pin) {
                eyre::bail!("sensors.pins contains duplicate pin {pin}");
            }
        }
        if self.sensors.timeout_us == 0 {
            eyre::bail!("sensors.timeout_us must be >= 1");
        }
        if self.sensors.samples_per_sensor == 0
            || self.sensors.samples_per_sensor > MAX_SAMPLES_PER_SENSOR
        {
            eyre::bail!("sensors.samples_per_sensor must be in [1, {MAX_SAMPLES_PER_SENSOR}]");
        }

        // Emitters
        let em = &self.emitters;
        if em.even_pin.is_some() && em.odd_pin.is_none() {
            eyre::bail!("emitters.even_pin requires emitters.odd_pin");
        }
        if let (Some(odd), Some(even)) = (em.odd_pin, em.even_pin)
            && odd == even
        {
            eyre::bail!("emitters.odd_pin and emitters.even_pin must differ");
        }
        for pin in [em.odd_pin, em.even_pin].into_iter().flatten() {
            if seen.contains(&pin) {
                eyre::bail!("emitter pin {pin} is also listed in sensors.pins");
            }
        }
        if em.dimming_level > MAX_DIMMING_LEVEL {
            eyre::bail!("emitters.dimming_level must be in [0, {MAX_DIMMING_LEVEL}]");
        }

        Ok(())
    }
}
