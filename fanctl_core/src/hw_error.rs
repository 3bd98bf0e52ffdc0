//! Maps `Box<dyn Error>` from trait boundaries to typed `FanError`.
//!
//! The traits in `fanctl_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `fanctl_hardware::HwError` downcasting.

use crate::error::FanError;

/// Map an actuator-side trait-boundary error to a typed `FanError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to the error's display text.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FanError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<fanctl_hardware::error::HwError>() {
            return match hw {
                fanctl_hardware::error::HwError::Sensor(msg)
                | fanctl_hardware::error::HwError::Parse(msg) => FanError::Sensor(msg.clone()),
                other => FanError::HardwareFault(other.to_string()),
            };
        }
    }

    FanError::Hardware(e.to_string())
}

/// Map a sensor-side trait-boundary error; everything becomes `FanError::Sensor`
/// unless it is a typed hardware fault.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> FanError {
    match map_hw_error(e) {
        FanError::Hardware(msg) => FanError::Sensor(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_map_to_hardware() {
        let e = std::io::Error::other("pwm write failed");
        assert_eq!(
            map_hw_error(&e),
            FanError::Hardware("pwm write failed".into())
        );
    }

    #[test]
    fn sensor_side_reclassifies_generic_errors() {
        let e = std::io::Error::other("adc busy");
        assert_eq!(map_sensor_error(&e), FanError::Sensor("adc busy".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        let e = fanctl_hardware::error::HwError::Pwm("channel busy".into());
        assert!(matches!(map_hw_error(&e), FanError::HardwareFault(_)));
        let e = fanctl_hardware::error::HwError::Parse("bad millidegrees".into());
        assert_eq!(
            map_hw_error(&e),
            FanError::Sensor("bad millidegrees".into())
        );
    }
}
