use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, warn};

use heater_traits::Actuator;

use crate::error::{HwError, Result};

struct Channel {
    pin: u8,
    pwm: bool,
    out: OutputPin,
}

/// Heater outputs on Raspberry Pi GPIO.
///
/// Graduated channels use rppal software PWM; on/off channels are plain level
/// writes. Values arrive polarity-corrected, so no inversion happens here.
pub struct GpioActuator {
    channels: Vec<Channel>,
    pwm_hz: f64,
}

impl GpioActuator {
    /// `channels` lists `(pin, pwm)` pairs. All pins start low.
    pub fn new(channels: &[(u8, bool)], pwm_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut out = Vec::with_capacity(channels.len());
        for &(pin, pwm) in channels {
            let p = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("open pin {pin}: {e}")))?
                .into_output_low();
            out.push(Channel { pin, pwm, out: p });
        }
        debug!(count = out.len(), pwm_hz, "gpio actuator ready");
        Ok(Self {
            channels: out,
            pwm_hz,
        })
    }
}

impl Actuator for GpioActuator {
    fn write(
        &mut self,
        channel: u8,
        value: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let hz = self.pwm_hz;
        let ch = self
            .channels
            .iter_mut()
            .find(|c| c.pin == channel)
            .ok_or(HwError::UnknownChannel(channel))?;
        if ch.pwm {
            match value {
                0 => {
                    if let Err(e) = ch.out.clear_pwm() {
                        warn!(pin = ch.pin, error = %e, "clear_pwm failed");
                    }
                    ch.out.set_low();
                }
                255 => {
                    if let Err(e) = ch.out.clear_pwm() {
                        warn!(pin = ch.pin, error = %e, "clear_pwm failed");
                    }
                    ch.out.set_high();
                }
                v => ch
                    .out
                    .set_pwm_frequency(hz, f64::from(v) / 255.0)
                    .map_err(|e| HwError::Gpio(format!("pwm pin {}: {e}", ch.pin)))?,
            }
        } else if value != 0 {
            ch.out.set_high();
        } else {
            ch.out.set_low();
        }
        Ok(())
    }
}
