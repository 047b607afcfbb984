#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the heater controller.
//!
//! - `Config` and its sub-structs are deserialized from TOML and validated.
//! - `GainsFile` is the on-disk format of persisted PID gains, written by the
//!   core's gain store and read back at initialization.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Upper bound on configured heaters; identifiers must fit a dense `u8` index.
pub const MAX_HEATERS: usize = 32;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    #[default]
    Thermistor,
    Thermocouple,
    Ad595,
    Pt100,
    Dummy,
}

/// One row of the heater configuration table.
#[derive(Debug, Deserialize, Clone)]
pub struct HeaterDef {
    pub name: String,
    /// Actuation pin / channel number.
    pub pin: u8,
    /// Drive the output inverted (active-low MOSFET boards).
    #[serde(default)]
    pub invert: bool,
    /// Channel supports graduated output; false selects bang-bang control.
    #[serde(default = "default_true")]
    pub pwm: bool,
    #[serde(default)]
    pub sensor: SensorType,
    /// Gains in internal fixed-point units; absent values use the built-in defaults.
    pub p: Option<i64>,
    pub i: Option<i64>,
    pub d: Option<i64>,
    pub i_limit: Option<i64>,
    /// Rated power in watts.
    pub watts: u32,
    /// Expected lag between an actuation change and a visible temperature change.
    pub dead_time_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Control tick period in milliseconds.
    pub tick_ms: u64,
    /// Bang-bang half band in quarter degrees.
    pub bang_bang_threshold: Option<u16>,
    /// Optional on/off pair; the effective threshold is their midpoint.
    pub bang_bang_on: Option<u16>,
    pub bang_bang_off: Option<u16>,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            bang_bang_threshold: None,
            bang_bang_on: None,
            bang_bang_off: None,
        }
    }
}

impl ControlCfg {
    /// Effective bang-bang threshold: the on/off midpoint when both are given,
    /// else the explicit threshold. `None` lets the core pick its default.
    pub fn effective_bang_bang_threshold(&self) -> Option<u16> {
        match (self.bang_bang_on, self.bang_bang_off) {
            (Some(on), Some(off)) => Some(((u32::from(on) + u32::from(off)) / 2) as u16),
            _ => self.bang_bang_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SanityCfg {
    pub enabled: bool,
    /// Plausibility band around the last sane temperature, quarter degrees.
    pub band_qc: u16,
    /// Floor on the dead-time-derived tolerance.
    pub min_tolerance_ticks: u32,
    /// Suspect ticks allowed on top of the dead-time before a fault.
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StorageCfg {
    /// Path of the persisted gains file. Absent disables persistence.
    pub gains_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub sanity: SanityCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default, rename = "heater")]
    pub heaters: Vec<HeaterDef>,
}

fn default_true() -> bool {
    true
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Control
        if self.control.tick_ms == 0 {
            eyre::bail!("control.tick_ms must be >= 1");
        }
        if self.control.tick_ms > 60_000 {
            eyre::bail!("control.tick_ms is unreasonably large (>60s)");
        }
        match (self.control.bang_bang_on, self.control.bang_bang_off) {
            (Some(on), Some(off)) if on > off => {
                eyre::bail!("control.bang_bang_on must be <= control.bang_bang_off");
            }
            (Some(_), None) | (None, Some(_)) => {
                eyre::bail!("control.bang_bang_on and control.bang_bang_off must be set together");
            }
            _ => {}
        }

        // Sanity
        if self.sanity.band_qc == 0 {
            eyre::bail!("sanity.band_qc must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
            }
        }

        // Heaters
        if self.heaters.is_empty() {
            eyre::bail!("at least one [[heater]] must be configured");
        }
        if self.heaters.len() > MAX_HEATERS {
            eyre::bail!(
                "too many heaters: {} configured, at most {MAX_HEATERS} supported",
                self.heaters.len()
            );
        }
        let mut names = HashSet::new();
        let mut pins = HashSet::new();
        for (idx, h) in self.heaters.iter().enumerate() {
            if h.name.trim().is_empty() {
                eyre::bail!("heater[{idx}].name must not be empty");
            }
            if !names.insert(h.name.as_str()) {
                eyre::bail!("heater[{idx}].name {:?} is duplicated", h.name);
            }
            if !pins.insert(h.pin) {
                eyre::bail!("heater[{idx}].pin {} is used by another heater", h.pin);
            }
            for (key, value) in [("p", h.p), ("i", h.i), ("d", h.d)] {
                if let Some(v) = value {
                    if i32::try_from(v).is_err() {
                        eyre::bail!("heater[{idx}].{key} = {v} does not fit a signed 32-bit gain");
                    }
                }
            }
            if let Some(limit) = h.i_limit {
                if !(0..=i64::from(i16::MAX)).contains(&limit) {
                    eyre::bail!("heater[{idx}].i_limit must be in [0, {}]", i16::MAX);
                }
            }
            if h.watts == 0 {
                eyre::bail!("heater[{idx}].watts must be > 0");
            }
            if h.dead_time_ms == 0 {
                eyre::bail!("heater[{idx}].dead_time_ms must be >= 1");
            }
        }

        Ok(())
    }

    /// Position of a heater by name in the table.
    pub fn heater_index(&self, name: &str) -> Option<usize> {
        self.heaters.iter().position(|h| h.name == name)
    }
}

/// Gains for one heater as persisted between runs, keyed by heater name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PersistedGains {
    pub name: String,
    pub p: i64,
    pub i: i64,
    pub d: i64,
    pub i_limit: i64,
}

/// On-disk persisted gain set.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct GainsFile {
    #[serde(default, rename = "heater")]
    pub heaters: Vec<PersistedGains>,
}

impl GainsFile {
    pub fn from_toml(s: &str) -> eyre::Result<Self> {
        toml::from_str(s).map_err(|e| eyre::eyre!("parse gains file: {e}"))
    }

    pub fn to_toml(&self) -> eyre::Result<String> {
        toml::to_string(self).map_err(|e| eyre::eyre!("serialize gains file: {e}"))
    }

    /// Load a gains file; a missing file means nothing has been saved yet.
    pub fn load(path: &Path) -> eyre::Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(eyre::eyre!("read gains file {}: {}", path.display(), e)),
        }
    }
}
