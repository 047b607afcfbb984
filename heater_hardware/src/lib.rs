//! Heater I/O backends.
//!
//! - `sim`: thermal plant simulation with dead-time and fault injection,
//!   used by the CLI and by tests.
//! - `gpio` (feature `hardware`, Linux): pin-level actuator via `rppal`.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;

pub use sim::{SimActuator, SimControl, SimHeater, SimSensors, simulated_plant};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioActuator;
