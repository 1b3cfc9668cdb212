//! Raw acquisition for RC and analog sensor lines.

use qtr_traits::{Hal, HalResult, Level, PinMode};
use tracing::trace;

use crate::error::Result;
use crate::hw_error::hw;
use crate::sensors::QtrSensors;
use crate::timing::RC_CHARGE_US;
use crate::types::SensorType;

impl<H: Hal> QtrSensors<H> {
    /// Fill `values[start]`, `values[start + step]`, ... for every channel at
    /// that stride; other slots are left untouched. A no-op until both the
    /// sensing type and the pins are configured.
    pub(crate) fn read_private(&mut self, values: &mut [u32], start: usize, step: usize) -> Result<()> {
        let count = self.sensor_pins.len().min(values.len());
        if count == 0 {
            return Ok(());
        }
        match self.sensor_type {
            Some(SensorType::Rc) => self.read_rc(&mut values[..count], start, step),
            Some(SensorType::Analog) => self.read_analog(&mut values[..count], start, step),
            None => Ok(()),
        }
    }

    /// Charge the lines, release them together and record, per channel, the
    /// first elapsed time at which the line reads low. Lines that never go
    /// low before `max_value` keep `max_value`.
    fn read_rc(&mut self, values: &mut [u32], start: usize, step: usize) -> Result<()> {
        let max = u32::from(self.max_value);
        let pins = &self.sensor_pins;
        let n = values.len();
        let targets = move || (start..n).step_by(step);

        for i in targets() {
            values[i] = max;
            // Briefly drives the line low on some platforms; harmless.
            self.hal.set_pin_mode(pins[i], PinMode::Output).map_err(hw)?;
            self.hal.digital_write(pins[i], Level::High).map_err(hw)?;
        }

        self.hal.delay_us(RC_CHARGE_US);

        // Start time is taken before the first line is released, so no
        // channel can report less than its true decay time.
        let start_time = self
            .hal
            .with_interrupts_masked(|hal| -> HalResult<u32> {
                let t0 = hal.micros();
                for i in targets() {
                    hal.set_pin_mode(pins[i], PinMode::Input)?;
                }
                Ok(t0)
            })
            .map_err(hw)?;

        let mut time = 0u32;
        while time < max {
            // Masked only for one sampling instant at a time.
            self.hal
                .with_interrupts_masked(|hal| -> HalResult<()> {
                    time = hal.us_since(start_time);
                    for i in targets() {
                        if time < values[i] && hal.digital_read(pins[i])?.is_low() {
                            values[i] = time;
                        }
                    }
                    Ok(())
                })
                .map_err(hw)?;
        }
        trace!(start, step, values = ?values, "rc read");
        Ok(())
    }

    /// Average `samples_per_sensor` conversions per channel, rounding to
    /// nearest.
    fn read_analog(&mut self, values: &mut [u32], start: usize, step: usize) -> Result<()> {
        let samples = u32::from(self.samples_per_sensor.max(1));
        let n = values.len();
        let targets = move || (start..n).step_by(step);

        for i in targets() {
            values[i] = 0;
        }
        for _ in 0..samples {
            for i in targets() {
                let sample = self.hal.analog_sample(self.sensor_pins[i]).map_err(hw)?;
                values[i] += u32::from(sample);
            }
        }
        for i in targets() {
            values[i] = (values[i] + (samples >> 1)) / samples;
        }
        trace!(start, step, values = ?values, "analog read");
        Ok(())
    }
}
