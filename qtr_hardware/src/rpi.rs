//! Raspberry Pi backend over rppal.
//!
//! Pins are claimed lazily as `IoPin`s so the driver can flip RC lines between
//! output and input. The Pi has no on-board ADC, and userspace cannot mask
//! interrupts; see `crate::rt` for reducing scheduling jitter instead.

use std::collections::HashMap;

use qtr_traits::{AnalogIn, Clock, Gpio, HalResult, InterruptMask, Level, MonotonicClock, Pin, PinMode};
use rppal::gpio::{Gpio as RppalGpio, IoPin, Mode};
use tracing::debug;

use crate::error::{HwError, Result};

pub struct RpiBoard {
    gpio: RppalGpio,
    pins: HashMap<Pin, IoPin>,
    clock: MonotonicClock,
}

impl RpiBoard {
    pub fn new() -> Result<Self> {
        let gpio = RppalGpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        Ok(Self {
            gpio,
            pins: HashMap::new(),
            clock: MonotonicClock::new(),
        })
    }

    fn io(&mut self, pin: Pin) -> Result<&mut IoPin> {
        if !self.pins.contains_key(&pin) {
            let io = self
                .gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?
                .into_io(Mode::Input);
            debug!(pin, "claimed gpio pin");
            self.pins.insert(pin, io);
        }
        self.pins.get_mut(&pin).ok_or(HwError::PinUnavailable(pin))
    }
}

impl Gpio for RpiBoard {
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode) -> HalResult<()> {
        let mode = match mode {
            PinMode::Input => Mode::Input,
            PinMode::Output => Mode::Output,
        };
        self.io(pin)?.set_mode(mode);
        Ok(())
    }

    fn digital_write(&mut self, pin: Pin, level: Level) -> HalResult<()> {
        let level = match level {
            Level::Low => rppal::gpio::Level::Low,
            Level::High => rppal::gpio::Level::High,
        };
        self.io(pin)?.write(level);
        Ok(())
    }

    fn digital_read(&mut self, pin: Pin) -> HalResult<Level> {
        Ok(match self.io(pin)?.read() {
            rppal::gpio::Level::Low => Level::Low,
            rppal::gpio::Level::High => Level::High,
        })
    }
}

impl AnalogIn for RpiBoard {
    fn analog_sample(&mut self, _pin: Pin) -> HalResult<u16> {
        Err(Box::new(HwError::AnalogUnsupported))
    }
}

impl Clock for RpiBoard {
    #[inline]
    fn micros(&mut self) -> u32 {
        self.clock.micros()
    }

    #[inline]
    fn delay_us(&mut self, us: u32) {
        self.clock.delay_us(us);
    }
}

impl InterruptMask for RpiBoard {
    // No-ops in userspace.
    fn disable_interrupts(&mut self) {}
    fn enable_interrupts(&mut self) {}
}
