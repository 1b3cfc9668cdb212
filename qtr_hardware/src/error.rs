use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pin {0} unavailable")]
    PinUnavailable(u8),
    #[error("analog sampling unsupported on this board")]
    AnalogUnsupported,
    #[error("realtime setup failed: {0}")]
    Realtime(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
