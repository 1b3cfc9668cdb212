pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;

#[cfg(all(feature = "rt", target_os = "linux"))]
pub mod rt;

pub use sim::{SimEvent, SimulatedBoard, Stamped};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use rpi::RpiBoard;
