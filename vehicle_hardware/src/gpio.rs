//! GPIO-backed sensors (Raspberry Pi via rppal).
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;
use vehicle_traits::{PresenceSensor, RangeFinder};

use crate::error::{HwError, Result};
use crate::util::{echo_to_cm, wait_for_level_with_timeout};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Digital presence input, e.g. an IR reflective sensor on the door edge.
pub struct GpioPresence {
    pin: InputPin,
    active_low: bool,
}

impl GpioPresence {
    pub fn new(pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let pin = gpio.get(pin).map_err(gpio_err)?.into_input_pullup();
        Ok(Self { pin, active_low })
    }
}

impl PresenceSensor for GpioPresence {
    fn is_present(&mut self) -> std::result::Result<bool, BoxError> {
        Ok(self.pin.is_high() != self.active_low)
    }
}

/// HC-SR04 style trigger/echo ultrasonic ranger.
pub struct UltrasonicRanger {
    trigger: OutputPin,
    echo: InputPin,
    timeout: Duration,
}

impl UltrasonicRanger {
    pub fn new(trigger_pin: u8, echo_pin: u8, timeout: Duration) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut trigger = gpio.get(trigger_pin).map_err(gpio_err)?.into_output();
        trigger.set_low();
        let echo = gpio.get(echo_pin).map_err(gpio_err)?.into_input();
        Ok(Self {
            trigger,
            echo,
            timeout,
        })
    }

    fn pulse(&mut self) -> Result<Duration> {
        self.trigger.set_high();
        let t = Instant::now();
        while t.elapsed() < Duration::from_micros(10) {
            std::hint::spin_loop();
        }
        self.trigger.set_low();

        let echo = &self.echo;
        let rise = wait_for_level_with_timeout(|| echo.is_high(), true, self.timeout, Duration::ZERO)?;
        let fall = wait_for_level_with_timeout(|| echo.is_high(), false, self.timeout, Duration::ZERO)?;
        Ok(fall.saturating_duration_since(rise))
    }
}

impl RangeFinder for UltrasonicRanger {
    fn measure_cm(&mut self, max_cm: u32) -> std::result::Result<u32, BoxError> {
        let width = self.pulse()?;
        let cm = echo_to_cm(width, max_cm);
        trace!(echo_us = %width.as_micros(), cm, "ultrasonic");
        Ok(cm)
    }
}
