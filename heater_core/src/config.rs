//! Runtime configuration used by `HeaterArray`.
//!
//! Separate from the TOML schema in `heater_config`; see `conversions` for the
//! bridge.

use heater_traits::SensorKind;

use crate::fixed_point::{DEFAULT_BANG_BANG_THRESHOLD, TICK_MS};
use crate::gains::PidGains;

/// Static description of one heater, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaterSpec {
    pub name: String,
    /// Actuator channel / pin.
    pub channel: u8,
    /// Output is active-low.
    pub invert: bool,
    /// Graduated output (PID); false selects bang-bang.
    pub pwm: bool,
    pub sensor: SensorKind,
    /// Gains the heater starts with, before any persisted override.
    pub gains: PidGains,
    pub watts: u32,
    pub dead_time_ms: u64,
}

impl HeaterSpec {
    /// PWM heater with default gains.
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            name: name.into(),
            channel,
            invert: false,
            pwm: true,
            sensor: SensorKind::default(),
            gains: PidGains::default(),
            watts: 40,
            dead_time_ms: 10_000,
        }
    }

    /// Largest logical output this channel accepts.
    pub const fn max_output(&self) -> u8 {
        if self.pwm { u8::MAX } else { 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCfg {
    pub tick_ms: u64,
    /// Bang-bang half band, qC.
    pub bang_bang_threshold: u16,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            bang_bang_threshold: DEFAULT_BANG_BANG_THRESHOLD,
        }
    }
}

/// Sanity watchdog settings. `enabled = false` removes the watchdog from
/// every heater's runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityCfg {
    pub enabled: bool,
    /// Band around the last sane temperature, qC.
    pub band_qc: u16,
    /// Lower bound on the dead-time derived tolerance.
    pub min_tolerance_ticks: u32,
    /// Extra suspect ticks on top of the dead-time. A healthy heater may
    /// need a few ticks past its dead-time before the reading moves by a
    /// whole quarter degree.
    pub margin_ticks: u32,
}

impl Default for SanityCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            band_qc: 12,
            min_tolerance_ticks: 4,
            margin_ticks: 4,
        }
    }
}

impl SanityCfg {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
