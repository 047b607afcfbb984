//! Temperature samples as delivered by the sensor subsystem.
//!
//! Values are in quarter degrees Celsius (qC). The sensor subsystem owns the
//! ADC-to-temperature math; the core only needs to know whether a value is
//! usable for its sensor type.

use std::ops::RangeInclusive;

/// Sensor technology behind a heater's temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SensorKind {
    #[default]
    Thermistor,
    /// MAX6675 / MAX31855 class thermocouple amplifiers.
    Thermocouple,
    Ad595,
    Pt100,
    /// Bench/testing sensor; every value is accepted.
    Dummy,
}

impl SensorKind {
    /// Plausible readings in quarter degrees. Anything outside is treated as a
    /// shorted or open sensor.
    pub const fn valid_range_qc(self) -> RangeInclusive<u16> {
        match self {
            SensorKind::Thermistor => 0..=1400,
            SensorKind::Thermocouple => 0..=4095,
            SensorKind::Ad595 => 0..=2000,
            SensorKind::Pt100 => 0..=2400,
            SensorKind::Dummy => 0..=u16::MAX,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::Thermistor => "thermistor",
            SensorKind::Thermocouple => "thermocouple",
            SensorKind::Ad595 => "ad595",
            SensorKind::Pt100 => "pt100",
            SensorKind::Dummy => "dummy",
        }
    }
}

/// One reading for one heater, tagged with the sensor kind that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempSample {
    pub kind: SensorKind,
    /// `None` when the sensor subsystem reported a disconnected sensor.
    pub value_qc: Option<u16>,
}

impl TempSample {
    pub const fn new(kind: SensorKind, value_qc: u16) -> Self {
        Self {
            kind,
            value_qc: Some(value_qc),
        }
    }

    pub const fn disconnected(kind: SensorKind) -> Self {
        Self {
            kind,
            value_qc: None,
        }
    }

    /// The reading if it is present and within the kind's plausible range.
    pub fn usable(&self) -> Option<u16> {
        self.value_qc
            .filter(|v| self.kind.valid_range_qc().contains(v))
    }
}
