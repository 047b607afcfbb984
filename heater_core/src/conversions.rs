//! Bridges from `heater_config` TOML types to runtime types.

use heater_traits::SensorKind;

use crate::config::{ControlCfg, HeaterSpec, SanityCfg};
use crate::error::{HeaterError, Result};
use crate::fixed_point::DEFAULT_BANG_BANG_THRESHOLD;
use crate::gains::{GainKind, PidGains};

// ── Sensors ──────────────────────────────────────────────────────────────────

const fn sensor_kind(s: heater_config::SensorType) -> SensorKind {
    match s {
        heater_config::SensorType::Thermistor => SensorKind::Thermistor,
        heater_config::SensorType::Thermocouple => SensorKind::Thermocouple,
        heater_config::SensorType::Ad595 => SensorKind::Ad595,
        heater_config::SensorType::Pt100 => SensorKind::Pt100,
        heater_config::SensorType::Dummy => SensorKind::Dummy,
    }
}

// ── Heaters ──────────────────────────────────────────────────────────────────

impl TryFrom<&heater_config::HeaterDef> for HeaterSpec {
    type Error = HeaterError;

    fn try_from(h: &heater_config::HeaterDef) -> std::result::Result<Self, Self::Error> {
        let mut gains = PidGains::default();
        for (kind, value) in [
            (GainKind::P, h.p),
            (GainKind::I, h.i),
            (GainKind::D, h.d),
            (GainKind::ILimit, h.i_limit),
        ] {
            if let Some(v) = value {
                gains = gains.with(kind, v)?;
            }
        }
        Ok(Self {
            name: h.name.clone(),
            channel: h.pin,
            invert: h.invert,
            pwm: h.pwm,
            sensor: sensor_kind(h.sensor),
            gains,
            watts: h.watts,
            dead_time_ms: h.dead_time_ms,
        })
    }
}

/// Runtime heater table from a validated config, in configuration order.
pub fn heater_specs(cfg: &heater_config::Config) -> Result<Vec<HeaterSpec>> {
    cfg.heaters
        .iter()
        .map(|h| HeaterSpec::try_from(h).map_err(eyre::Report::new))
        .collect()
}

// ── Control / sanity ─────────────────────────────────────────────────────────

impl From<&heater_config::ControlCfg> for ControlCfg {
    fn from(c: &heater_config::ControlCfg) -> Self {
        Self {
            tick_ms: c.tick_ms,
            bang_bang_threshold: c
                .effective_bang_bang_threshold()
                .unwrap_or(DEFAULT_BANG_BANG_THRESHOLD),
        }
    }
}

impl From<&heater_config::SanityCfg> for SanityCfg {
    fn from(c: &heater_config::SanityCfg) -> Self {
        Self {
            enabled: c.enabled,
            band_qc: c.band_qc,
            min_tolerance_ticks: c.min_tolerance_ticks,
            margin_ticks: c.margin_ticks,
        }
    }
}
