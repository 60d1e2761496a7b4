//! Runtime configuration for the instrumentation tasks.
//!
//! These structs are what the controller and the individual state machines
//! consume. They are separate from the TOML-deserialized config in
//! `vehicle_config`; see `conversions` for the bridge.
use crate::error::BuildError;
use std::time::Duration;

/// Acceleration sampler settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelCfg {
    /// Weight of the previous filtered value: `f = alpha*f + (1-alpha)*raw`.
    pub alpha: f32,
    pub period_ms: u64,
    /// Bounded wait for the shared-state lock on publish. A miss drops the update.
    pub publish_lock_ms: u64,
    /// Bounded wait for the shared-state lock on snapshot.
    pub read_lock_ms: u64,
}

impl Default for AccelCfg {
    fn default() -> Self {
        Self {
            alpha: 0.8,
            period_ms: 200,
            publish_lock_ms: 5,
            read_lock_ms: 10,
        }
    }
}

impl AccelCfg {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_lock_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_lock_ms)
    }
}

/// Speed/direction estimator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedCfg {
    pub period_ms: u64,
    pub stationary_threshold_g: f32,
    pub stationary_count: u32,
    /// Minimum filtered axis value (g) for a direction decision.
    pub dominant_axis_g: f32,
    pub damping: f32,
}

impl Default for SpeedCfg {
    fn default() -> Self {
        Self {
            period_ms: 100,
            stationary_threshold_g: 0.05,
            stationary_count: 10,
            dominant_axis_g: 0.1,
            damping: 0.98,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashCfg {
    pub threshold_g: f32,
    pub reset_ms: u64,
    pub period_ms: u64,
}

impl Default for CrashCfg {
    fn default() -> Self {
        Self {
            threshold_g: 4.0,
            reset_ms: 5000,
            period_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorCfg {
    pub period_ms: u64,
    pub debounce_count: u8,
    pub queue_capacity: usize,
}

impl Default for DoorCfg {
    fn default() -> Self {
        Self {
            period_ms: 100,
            debounce_count: 3,
            queue_capacity: 10,
        }
    }
}

/// Day/night classifier thresholds. Night→Day requires the average to exceed
/// `day_threshold_lux * hysteresis_factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCfg {
    pub period_ms: u64,
    pub night_threshold_lux: f64,
    pub day_threshold_lux: f64,
    pub hysteresis_factor: f64,
}

impl Default for LightCfg {
    fn default() -> Self {
        Self {
            period_ms: 2000,
            night_threshold_lux: 10.0,
            day_threshold_lux: 50.0,
            hysteresis_factor: 1.5,
        }
    }
}

impl LightCfg {
    #[inline]
    pub fn day_enter_lux(&self) -> f64 {
        self.day_threshold_lux * self.hysteresis_factor
    }
}

/// Proximity band edges in centimetres; `danger < warning < safe <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityCfg {
    pub period_ms: u64,
    pub danger_cm: u32,
    pub warning_cm: u32,
    pub safe_cm: u32,
    pub max_cm: u32,
}

impl Default for ProximityCfg {
    fn default() -> Self {
        Self {
            period_ms: 200,
            danger_cm: 30,
            warning_cm: 80,
            safe_cm: 150,
            max_cm: 400,
        }
    }
}

/// Everything the controller needs to start its tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoreConfig {
    pub accel: AccelCfg,
    pub speed: SpeedCfg,
    pub crash: CrashCfg,
    pub door: DoorCfg,
    pub light: LightCfg,
    pub proximity: ProximityCfg,
}

impl CoreConfig {
    /// Structural checks the state machines rely on. `vehicle_config` performs
    /// the user-facing validation with richer messages.
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(0.0..1.0).contains(&self.accel.alpha) {
            return Err(BuildError::InvalidConfig("accel.alpha must be in [0.0, 1.0)"));
        }
        if self.accel.publish_lock_ms == 0 || self.accel.read_lock_ms == 0 {
            return Err(BuildError::InvalidConfig("accel lock timeouts must be >= 1 ms"));
        }
        if self.speed.stationary_count == 0 {
            return Err(BuildError::InvalidConfig("speed.stationary_count must be >= 1"));
        }
        if !(self.speed.damping > 0.0 && self.speed.damping <= 1.0) {
            return Err(BuildError::InvalidConfig("speed.damping must be in (0.0, 1.0]"));
        }
        if !(self.crash.threshold_g > 0.0 && self.crash.threshold_g.is_finite()) {
            return Err(BuildError::InvalidConfig("crash.threshold_g must be > 0"));
        }
        if self.door.debounce_count == 0 {
            return Err(BuildError::InvalidConfig("door.debounce_count must be >= 1"));
        }
        if self.door.queue_capacity == 0 {
            return Err(BuildError::InvalidConfig("door.queue_capacity must be >= 1"));
        }
        if self.light.day_enter_lux() <= self.light.night_threshold_lux {
            return Err(BuildError::InvalidConfig(
                "light day threshold must exceed night threshold",
            ));
        }
        let p = &self.proximity;
        if !(p.danger_cm < p.warning_cm && p.warning_cm < p.safe_cm && p.safe_cm <= p.max_cm) {
            return Err(BuildError::InvalidConfig(
                "proximity bands must satisfy danger < warning < safe <= max",
            ));
        }
        Ok(())
    }
}
