//! Emitter bank control: on/off/select with settle times and software dimming.
//!
//! With one emitter pin, that pin drives every emitter and only
//! `Emitters::All` affects it. With two pins the odd and even banks can be
//! switched independently.
//!
//! Dimmable emitter drivers latch a brightness level from the number of short
//! low pulses seen right after the pin goes high. Turning an already lit
//! dimmable bank "on" therefore forces it off first, otherwise the old level
//! would stick.

use qtr_traits::{Hal, HalResult, Level, Pin, PinMode};
use tracing::trace;

use crate::error::Result;
use crate::hw_error::hw;
use crate::sensors::QtrSensors;
use crate::timing::{
    DIMMABLE_OFF_US, DIMMABLE_ON_US, DIMMING_PULSE_US, EMITTER_SETTLE_US, SETTLE_POLL_US,
};
use crate::types::Emitters;

/// Emitter pins and dimming settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterConfig {
    pub odd: Option<Pin>,
    pub even: Option<Pin>,
    pub dimmable: bool,
    pub dimming_level: u8,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            odd: None,
            even: None,
            dimmable: true,
            dimming_level: 0,
        }
    }
}

impl EmitterConfig {
    pub fn pin_count(&self) -> u8 {
        match (self.odd, self.even) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) | (None, Some(_)) => 1,
            (None, None) => 0,
        }
    }

    /// Odd pin is used for: all emitters (either wiring), or the odd bank
    /// with two pins.
    fn odd_selected(&self, emitters: Emitters) -> Option<Pin> {
        let selected =
            emitters == Emitters::All || (self.pin_count() == 2 && emitters == Emitters::Odd);
        if selected { self.odd } else { None }
    }

    /// Even pin is used only with two pins, for all emitters or the even bank.
    fn even_selected(&self, emitters: Emitters) -> Option<Pin> {
        let selected = self.pin_count() == 2
            && (emitters == Emitters::All || emitters == Emitters::Even);
        if selected { self.even } else { None }
    }
}

impl<H: Hal> QtrSensors<H> {
    /// Use one emitter pin for the whole array. Releases previously
    /// configured emitter pins first.
    pub fn set_emitter_pin(&mut self, pin: Pin) -> Result<()> {
        self.release_emitter_pins()?;
        self.emitters.odd = Some(pin);
        self.hal.set_pin_mode(pin, PinMode::Output).map_err(hw)?;
        Ok(())
    }

    /// Use separate odd and even emitter banks. Releases previously
    /// configured emitter pins first.
    pub fn set_emitter_pins(&mut self, odd: Pin, even: Pin) -> Result<()> {
        self.release_emitter_pins()?;
        self.emitters.odd = Some(odd);
        self.emitters.even = Some(even);
        self.hal.set_pin_mode(odd, PinMode::Output).map_err(hw)?;
        self.hal.set_pin_mode(even, PinMode::Output).map_err(hw)?;
        Ok(())
    }

    /// Return emitter pins to input mode and forget them.
    pub fn release_emitter_pins(&mut self) -> Result<()> {
        if let Some(pin) = self.emitters.odd.take() {
            self.hal.set_pin_mode(pin, PinMode::Input).map_err(hw)?;
        }
        if let Some(pin) = self.emitters.even.take() {
            self.hal.set_pin_mode(pin, PinMode::Input).map_err(hw)?;
        }
        Ok(())
    }

    /// Turn the selected emitters off. Banks that are already off are left
    /// alone; `wait` blocks for the driver's turn-off time if anything changed.
    pub fn emitters_off(&mut self, emitters: Emitters, wait: bool) -> Result<()> {
        let mut changed = false;
        let pins = [
            self.emitters.odd_selected(emitters),
            self.emitters.even_selected(emitters),
        ];
        for pin in pins.into_iter().flatten() {
            if self.hal.digital_read(pin).map_err(hw)?.is_high() {
                self.hal.digital_write(pin, Level::Low).map_err(hw)?;
                trace!(pin, "emitter off");
                changed = true;
            }
        }

        if wait && changed {
            let settle = if self.emitters.dimmable {
                DIMMABLE_OFF_US
            } else {
                EMITTER_SETTLE_US
            };
            self.hal.delay_us(settle);
        }
        Ok(())
    }

    /// Turn the selected emitters on. Non-dimmable banks that are already on
    /// are left alone; dimmable banks are always re-asserted so the current
    /// dimming level takes effect.
    pub fn emitters_on(&mut self, emitters: Emitters, wait: bool) -> Result<()> {
        let mut on_start = None;
        let pins = [
            self.emitters.odd_selected(emitters),
            self.emitters.even_selected(emitters),
        ];
        for pin in pins.into_iter().flatten() {
            if self.emitters.dimmable || self.hal.digital_read(pin).map_err(hw)?.is_low() {
                on_start = Some(self.emitters_on_with_pin(pin)?);
            }
        }

        if wait && let Some(start) = on_start {
            if self.emitters.dimmable {
                // Dimming pulses already used part of the turn-on time.
                while self.hal.us_since(start) < DIMMABLE_ON_US {
                    self.hal.delay_us(SETTLE_POLL_US);
                }
            } else {
                self.hal.delay_us(EMITTER_SETTLE_US);
            }
        }
        Ok(())
    }

    /// Drive `pin` high (applying dimming) and return the time it first went
    /// high.
    fn emitters_on_with_pin(&mut self, pin: Pin) -> Result<u32> {
        if self.emitters.dimmable && self.hal.digital_read(pin).map_err(hw)?.is_high() {
            // Happens even when the caller passed wait = false.
            self.hal.digital_write(pin, Level::Low).map_err(hw)?;
            self.hal.delay_us(DIMMABLE_OFF_US);
        }

        self.hal.digital_write(pin, Level::High).map_err(hw)?;
        let on_start = self.hal.micros();

        let level = self.emitters.dimming_level;
        if self.emitters.dimmable && level > 0 {
            self.hal
                .with_interrupts_masked(|hal| -> HalResult<()> {
                    for _ in 0..level {
                        hal.delay_us(DIMMING_PULSE_US);
                        hal.digital_write(pin, Level::Low)?;
                        hal.delay_us(DIMMING_PULSE_US);
                        hal.digital_write(pin, Level::High)?;
                    }
                    Ok(())
                })
                .map_err(hw)?;
        }
        trace!(pin, level, "emitter on");
        Ok(on_start)
    }

    /// Light exactly the selected bank.
    ///
    /// For `Odd`/`Even` the other bank is switched off without waiting, the
    /// selected bank is switched on (waiting its own settle time), and for
    /// dimmable emitters the remaining off time of the other bank is waited
    /// out, so both settle times overlap.
    pub fn emitters_select(&mut self, emitters: Emitters) -> Result<()> {
        let off_emitters = match emitters {
            Emitters::Odd => Emitters::Even,
            Emitters::Even => Emitters::Odd,
            Emitters::All => return self.emitters_on(Emitters::All, true),
            Emitters::None => return self.emitters_off(Emitters::All, true),
        };

        self.emitters_off(off_emitters, false)?;
        let off_start = self.hal.micros();

        self.emitters_on(emitters, true)?;

        if self.emitters.dimmable {
            while self.hal.us_since(off_start) < DIMMABLE_OFF_US {
                self.hal.delay_us(SETTLE_POLL_US);
            }
        }
        Ok(())
    }

    /// `emitters_on` with a raw selector; unknown selectors are a no-op.
    pub fn emitters_on_by_index(&mut self, emitters: u8, wait: bool) -> Result<()> {
        match Emitters::from_index(emitters) {
            Some(emitters) => self.emitters_on(emitters, wait),
            None => Ok(()),
        }
    }

    /// `emitters_off` with a raw selector; unknown selectors are a no-op.
    pub fn emitters_off_by_index(&mut self, emitters: u8, wait: bool) -> Result<()> {
        match Emitters::from_index(emitters) {
            Some(emitters) => self.emitters_off(emitters, wait),
            None => Ok(()),
        }
    }

    /// `emitters_select` with a raw selector; unknown selectors are a no-op.
    pub fn emitters_select_by_index(&mut self, emitters: u8) -> Result<()> {
        match Emitters::from_index(emitters) {
            Some(emitters) => self.emitters_select(emitters),
            None => Ok(()),
        }
    }
}
