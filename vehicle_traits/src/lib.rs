//! Collaborator seams for the instrumentation core.
//!
//! Sensor drivers, notification sinks and the clock are consumed only through
//! these traits, so the core stays hardware-agnostic and testable.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::sync::{Arc, Mutex};

/// One raw 3-axis accelerometer reading, in g.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RawSample {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the full vector.
    #[inline]
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

pub trait Accelerometer {
    fn read(&mut self) -> Result<RawSample, Box<dyn std::error::Error + Send + Sync>>;
}

/// Binary presence input (e.g. a reflective IR sensor facing a door edge).
pub trait PresenceSensor {
    fn is_present(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait LightSensor {
    fn read_lux(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Distance ranging; implementations report at most `max_cm`.
pub trait RangeFinder {
    fn measure_cm(&mut self, max_cm: u32)
    -> Result<u32, Box<dyn std::error::Error + Send + Sync>>;
}

/// Outbound sink for crash notifications (serial line, message bus, ...).
pub trait CrashNotifier {
    fn notify(
        &mut self,
        formatted_timestamp: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

// Boxed sensors are what the controller builder stores.
impl<T: Accelerometer + ?Sized> Accelerometer for Box<T> {
    fn read(&mut self) -> Result<RawSample, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

impl<T: PresenceSensor + ?Sized> PresenceSensor for Box<T> {
    fn is_present(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_present()
    }
}

impl<T: LightSensor + ?Sized> LightSensor for Box<T> {
    fn read_lux(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_lux()
    }
}

impl<T: RangeFinder + ?Sized> RangeFinder for Box<T> {
    fn measure_cm(
        &mut self,
        max_cm: u32,
    ) -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).measure_cm(max_cm)
    }
}

impl<T: CrashNotifier + ?Sized> CrashNotifier for Box<T> {
    fn notify(
        &mut self,
        formatted_timestamp: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).notify(formatted_timestamp)
    }
}

/// One physical accelerometer is read by both the smoothing sampler and the
/// crash detector; sharing goes through a mutex so each task can own a handle.
impl<T: Accelerometer + ?Sized> Accelerometer for Arc<Mutex<T>> {
    fn read(&mut self) -> Result<RawSample, Box<dyn std::error::Error + Send + Sync>> {
        let mut guard = self
            .lock()
            .map_err(|_| std::io::Error::other("accelerometer mutex poisoned"))?;
        guard.read()
    }
}
