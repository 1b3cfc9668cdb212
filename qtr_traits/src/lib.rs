//! Hardware capabilities consumed by the reflectance sensor driver.
//!
//! The driver never touches registers directly; every pin operation, analog
//! conversion, clock read and interrupt mask goes through these traits so the
//! same code runs against real GPIO or a simulated board.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type used at the trait boundary.
pub type HalError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used at the trait boundary.
pub type HalResult<T> = Result<T, HalError>;

/// Platform pin identifier.
pub type Pin = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    #[inline]
    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

pub trait Gpio {
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode) -> HalResult<()>;
    fn digital_write(&mut self, pin: Pin, level: Level) -> HalResult<()>;
    /// Reads the pin level. For output pins this returns the driven level.
    fn digital_read(&mut self, pin: Pin) -> HalResult<Level>;
}

pub trait AnalogIn {
    /// One raw conversion on the given pin (10-bit on the reference platform).
    fn analog_sample(&mut self, pin: Pin) -> HalResult<u16>;
}

/// Scoped interrupt masking.
///
/// Critical sections built on this must stay short: nothing that can block
/// for a long time may run while interrupts are masked.
pub trait InterruptMask {
    fn disable_interrupts(&mut self);
    fn enable_interrupts(&mut self);

    /// Run `f` with interrupts masked. Interrupts are re-enabled after `f`
    /// returns, whatever it returns.
    fn with_interrupts_masked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        self.disable_interrupts();
        let out = f(self);
        self.enable_interrupts();
        out
    }
}

/// Full capability set required by the driver.
pub trait Hal: Gpio + AnalogIn + Clock + InterruptMask {}

impl<T: Gpio + AnalogIn + Clock + InterruptMask> Hal for T {}
