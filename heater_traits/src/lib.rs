//! Boundary traits between the heater control core and the outside world.
//!
//! The core never talks to pins or ADCs directly. Readings arrive as
//! [`TempSample`]s from a [`TemperatureSource`] and commanded values leave
//! through an [`Actuator`].

pub mod clock;
pub mod sensor;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use sensor::{SensorKind, TempSample};

/// Low-level output driver.
///
/// `value` is already polarity-corrected by the caller: 0..=255 for graduated
/// (PWM) channels, 0 or 1 for on/off channels. Implementations apply it as is
/// and must not block.
pub trait Actuator {
    fn write(
        &mut self,
        channel: u8,
        value: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn write(
        &mut self,
        channel: u8,
        value: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write(channel, value)
    }
}

/// Sensor subsystem as seen by the tick loop: one fresh sample per heater
/// index per tick, produced before the tick fires.
pub trait TemperatureSource {
    fn sample(&mut self, heater: usize) -> TempSample;
}

impl<T: TemperatureSource + ?Sized> TemperatureSource for Box<T> {
    fn sample(&mut self, heater: usize) -> TempSample {
        (**self).sample(heater)
    }
}
