use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QtrError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("buffer too small: needed {needed} values, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing sensor type")]
    MissingSensorType,
    #[error("missing sensor pins")]
    MissingSensorPins,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
