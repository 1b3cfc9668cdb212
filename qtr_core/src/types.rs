//! Selector enums shared across the driver.

/// Physical sensing method of the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    /// Charge the line, release it, time the discharge. Larger = darker.
    Rc,
    /// Sample the line voltage. Larger = more reflective.
    Analog,
}

impl From<qtr_config::SensorKind> for SensorType {
    fn from(kind: qtr_config::SensorKind) -> Self {
        match kind {
            qtr_config::SensorKind::Rc => SensorType::Rc,
            qtr_config::SensorKind::Analog => SensorType::Analog,
        }
    }
}

/// Emitter sequencing used by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Emitters off for the read.
    Off,
    /// Emitters on for the read, off afterwards.
    #[default]
    On,
    /// On reading minus off reading: `on + max_value - off`.
    OnAndOff,
    /// Odd bank lit while reading odd channels, even bank for even channels.
    OddEven,
    /// `OddEven` reading minus an off reading.
    OddEvenAndOff,
    /// Caller owns emitter state; the driver never touches the emitters.
    Manual,
}

impl ReadMode {
    /// Decode a raw selector (0 = Off .. 5 = Manual). Unknown values map to
    /// `None`, which the `*_by_index` entry points treat as a no-op.
    pub fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => ReadMode::Off,
            1 => ReadMode::On,
            2 => ReadMode::OnAndOff,
            3 => ReadMode::OddEven,
            4 => ReadMode::OddEvenAndOff,
            5 => ReadMode::Manual,
            _ => return None,
        })
    }

    /// True when the read needs the "on" calibration bounds.
    pub fn uses_on_context(self) -> bool {
        matches!(
            self,
            ReadMode::On | ReadMode::OddEven | ReadMode::OnAndOff | ReadMode::OddEvenAndOff
        )
    }

    /// True when the read needs the "off" calibration bounds.
    pub fn uses_off_context(self) -> bool {
        matches!(
            self,
            ReadMode::Off | ReadMode::OnAndOff | ReadMode::OddEvenAndOff
        )
    }

    /// True for the ambient-subtracting modes.
    pub fn combines_off(self) -> bool {
        matches!(self, ReadMode::OnAndOff | ReadMode::OddEvenAndOff)
    }
}

/// Emitter bank selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emitters {
    #[default]
    All,
    Odd,
    Even,
    None,
}

impl Emitters {
    /// Decode a raw selector (0 = All, 1 = Odd, 2 = Even, 3 = None).
    pub fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => Emitters::All,
            1 => Emitters::Odd,
            2 => Emitters::Even,
            3 => Emitters::None,
            _ => return None,
        })
    }
}

/// Which emitter state a set of calibration bounds was captured under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationContext {
    On,
    Off,
}

impl CalibrationContext {
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            CalibrationContext::On => 0,
            CalibrationContext::Off => 1,
        }
    }
}
