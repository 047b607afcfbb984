#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Heater control core (hardware-agnostic).
//!
//! Turns one temperature sample per heater per tick into an actuation value.
//! All I/O goes through `heater_traits::TemperatureSource` and
//! `heater_traits::Actuator`.
//!
//! ## Architecture
//!
//! - **Scaling**: fixed-point constants and unit conversion (`fixed_point`)
//! - **Control**: PID with integrator clamp and windowed derivative (`pid`,
//!   `history`), hysteresis for on/off channels (`bang_bang`)
//! - **Safety**: per-heater plausibility watchdog (`sanity`)
//! - **Tuning**: gain setters and persistence (`gains`, `settings`)
//! - **Coordination**: `HeaterArray` owns every heater's state behind its own
//!   lock, applies polarity and reports status (`array`, `status`)
//! - **Loop**: paced tick pass with latency statistics (`runner`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Temperatures are `u16` quarter degrees; gains are `i32` pre-scaled by
//! `SCALE_P`/`SCALE_I`/`SCALE_D`. Term products use 64-bit intermediates.

pub mod array;
pub mod atomic;
pub mod bang_bang;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod fixed_point;
pub mod gains;
pub mod history;
pub mod hw_error;
pub mod mocks;
pub mod pid;
pub mod runner;
pub mod runtime;
pub mod sanity;
pub mod settings;
pub mod status;
pub mod types;
pub mod util;

pub use array::HeaterArray;
pub use builder::{HeaterArrayBuilder, Missing, Set};
pub use config::{ControlCfg, HeaterSpec, SanityCfg};
pub use error::{BuildError, HeaterError, Result};
pub use gains::{GainKind, PidGains};
pub use pid::PidTerms;
pub use runner::{LoopStats, RunOptions};
pub use sanity::SanityState;
pub use settings::{GainStore, NullGainStore, TomlGainStore};
pub use status::{FaultReport, HeaterStatus, TickReport, TickSummary};
pub use types::HeaterId;

pub use heater_traits::{Actuator, SensorKind, TempSample, TemperatureSource};
