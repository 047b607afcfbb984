//! Maps `Box<dyn Error>` from the actuator boundary to a typed `HeaterError`.
//!
//! With the `hardware-errors` feature, `heater_hardware::error::HwError` is
//! downcast for a precise mapping; anything else falls back to the message.

use crate::error::HeaterError;

pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> HeaterError {
    #[cfg(feature = "hardware-errors")]
    {
        use heater_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => HeaterError::Timeout,
                HwError::UnknownChannel(_) => HeaterError::Actuator(hw.to_string()),
                other => HeaterError::ActuatorFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        HeaterError::Timeout
    } else {
        HeaterError::Actuator(s)
    }
}
