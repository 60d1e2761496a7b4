//! `From` implementations bridging `vehicle_config` types to `vehicle_core` types.

use crate::config::{AccelCfg, CoreConfig, CrashCfg, DoorCfg, LightCfg, ProximityCfg, SpeedCfg};

impl From<&vehicle_config::AccelCfg> for AccelCfg {
    fn from(c: &vehicle_config::AccelCfg) -> Self {
        Self {
            alpha: c.alpha,
            period_ms: c.period_ms,
            publish_lock_ms: c.publish_lock_ms,
            read_lock_ms: c.read_lock_ms,
        }
    }
}

impl From<&vehicle_config::SpeedCfg> for SpeedCfg {
    fn from(c: &vehicle_config::SpeedCfg) -> Self {
        Self {
            period_ms: c.period_ms,
            stationary_threshold_g: c.stationary_threshold_g,
            stationary_count: c.stationary_count,
            dominant_axis_g: c.dominant_axis_g,
            damping: c.damping,
        }
    }
}

impl From<&vehicle_config::CrashCfg> for CrashCfg {
    fn from(c: &vehicle_config::CrashCfg) -> Self {
        Self {
            threshold_g: c.threshold_g,
            reset_ms: c.reset_ms,
            period_ms: c.period_ms,
        }
    }
}

impl From<&vehicle_config::DoorCfg> for DoorCfg {
    fn from(c: &vehicle_config::DoorCfg) -> Self {
        Self {
            period_ms: c.period_ms,
            debounce_count: c.debounce_count,
            queue_capacity: c.queue_capacity,
        }
    }
}

impl From<&vehicle_config::LightCfg> for LightCfg {
    fn from(c: &vehicle_config::LightCfg) -> Self {
        Self {
            period_ms: c.period_ms,
            night_threshold_lux: c.night_threshold_lux,
            day_threshold_lux: c.day_threshold_lux,
            hysteresis_factor: c.hysteresis_factor,
        }
    }
}

impl From<&vehicle_config::ProximityCfg> for ProximityCfg {
    fn from(c: &vehicle_config::ProximityCfg) -> Self {
        Self {
            period_ms: c.period_ms,
            danger_cm: c.danger_cm,
            warning_cm: c.warning_cm,
            safe_cm: c.safe_cm,
            max_cm: c.max_cm,
        }
    }
}

impl From<&vehicle_config::Config> for CoreConfig {
    fn from(c: &vehicle_config::Config) -> Self {
        Self {
            accel: (&c.accel).into(),
            speed: (&c.speed).into(),
            crash: (&c.crash).into(),
            door: (&c.door).into(),
            light: (&c.light).into(),
            proximity: (&c.proximity).into(),
        }
    }
}
