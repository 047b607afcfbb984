use thiserror::Error;

use crate::gains::GainKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaterError {
    #[error("unknown heater id {0}")]
    UnknownHeater(u8),
    #[error("unknown heater name {0:?}")]
    UnknownHeaterName(String),
    #[error("gain {kind} = {value} is outside the representable range")]
    GainOutOfRange { kind: GainKind, value: i64 },
    #[error("actuator error: {0}")]
    Actuator(String),
    #[error("actuator fault: {0}")]
    ActuatorFault(String),
    #[error("timeout writing actuator")]
    Timeout,
    #[error("gain storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no heaters configured")]
    MissingHeaters,
    #[error("too many heaters: {0}")]
    TooManyHeaters(usize),
    #[error("duplicate heater name {0:?}")]
    DuplicateName(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
