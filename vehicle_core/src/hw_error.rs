//! Maps `Box<dyn Error>` from trait boundaries to typed `CoreError`.
//!
//! Sensor traits in `vehicle_traits` return `Box<dyn Error + Send + Sync>`;
//! this module converts those to the core error enum, with an optional
//! feature-gated path for `vehicle_hardware::HwError` downcasting.

use crate::error::CoreError;

/// Map a trait-boundary error to a typed `CoreError`.
///
/// Known hardware error types are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> CoreError {
    #[cfg(feature = "hardware-errors")]
    {
        use vehicle_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::EchoTimeout => CoreError::SensorTimeout,
                HwError::OutOfRange(_) => CoreError::SensorRead(hw.to_string()),
                other => CoreError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        CoreError::SensorTimeout
    } else {
        CoreError::SensorRead(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_text_maps_to_sensor_timeout() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("i2c Timeout on read"));
        assert_eq!(map_hw_error(e.as_ref()), CoreError::SensorTimeout);
    }

    #[test]
    fn other_text_maps_to_sensor_read() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("nack"));
        assert_eq!(map_hw_error(e.as_ref()), CoreError::SensorRead("nack".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_echo_timeout_is_typed() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(vehicle_hardware::error::HwError::EchoTimeout);
        assert_eq!(map_hw_error(e.as_ref()), CoreError::SensorTimeout);
    }
}
