#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the instrumentation controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section has defaults, so an empty document is a valid config.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AccelCfg {
    /// Exponential smoothing weight of the previous value. Range: [0.0, 1.0).
    pub alpha: f32,
    pub period_ms: u64,
    /// Max wait for the shared-state lock when publishing a sample.
    pub publish_lock_ms: u64,
    /// Max wait for the shared-state lock when taking a snapshot.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeedCfg {
    pub period_ms: u64,
    /// Horizontal magnitude (g) below which a tick counts as stationary
    pub stationary_threshold_g: f32,
    /// Consecutive stationary ticks before speed is forced to zero
    pub stationary_count: u32,
    pub dominant_axis_g: f32,
    /// Multiplicative damping applied to speed every moving tick
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CrashCfg {
    /// Gravity-compensated impact (g) that latches a crash
    pub threshold_g: f32,
    /// Auto-reset delay after a crash latches
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DoorCfg {
    pub period_ms: u64,
    /// Consecutive identical readings required to commit a new state
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LightCfg {
    pub period_ms: u64,
    pub night_threshold_lux: f64,
    pub day_threshold_lux: f64,
    /// Night→Day requires avg > day_threshold_lux * hysteresis_factor
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

#[derive(Debug, Deserialize)]
#[serde(default)]
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// GPIO wiring, only consulted by builds with the `hardware` feature.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    pub presence_pin: Option<u8>,
    /// Treat a low level as "present" when true
    pub presence_active_low: bool,
    pub ultrasonic_trigger_pin: Option<u8>,
    pub ultrasonic_echo_pin: Option<u8>,
    /// Max time to wait for an echo edge before failing the measurement
    pub ranging_timeout_ms: u64,
    /// Character device that receives crash notifications (e.g. "/dev/ttyS1")
    pub notifier_path: Option<String>,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            presence_pin: None,
            presence_active_low: false,
            ultrasonic_trigger_pin: None,
            ultrasonic_echo_pin: None,
            ranging_timeout_ms: 30,
            notifier_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub accel: AccelCfg,
    pub speed: SpeedCfg,
    pub crash: CrashCfg,
    pub door: DoorCfg,
    pub light: LightCfg,
    pub proximity: ProximityCfg,
    pub logging: Logging,
    pub hardware: Hardware,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a TOML config file, then validate it.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

fn require_period(name: &str, ms: u64) -> eyre::Result<()> {
    if ms == 0 {
        eyre::bail!("{name} must be >= 1");
    }
    if ms > 60 * 60 * 1000 {
        eyre::bail!("{name} is unreasonably large (>1h)");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Accel
        if !(self.accel.alpha >= 0.0 && self.accel.alpha < 1.0) {
            eyre::bail!("accel.alpha must be in [0.0, 1.0)");
        }
        require_period("accel.period_ms", self.accel.period_ms)?;
        if self.accel.publish_lock_ms == 0 {
            eyre::bail!("accel.publish_lock_ms must be >= 1");
        }
        if self.accel.read_lock_ms == 0 {
            eyre::bail!("accel.read_lock_ms must be >= 1");
        }

        // Speed
        require_period("speed.period_ms", self.speed.period_ms)?;
        if !(self.speed.stationary_threshold_g > 0.0) {
            eyre::bail!("speed.stationary_threshold_g must be > 0");
        }
        if self.speed.stationary_count == 0 {
            eyre::bail!("speed.stationary_count must be >= 1");
        }
        if self.speed.dominant_axis_g.is_sign_negative() || !self.speed.dominant_axis_g.is_finite() {
            eyre::bail!("speed.dominant_axis_g must be >= 0");
        }
        if !(self.speed.damping > 0.0 && self.speed.damping <= 1.0) {
            eyre::bail!("speed.damping must be in (0.0, 1.0]");
        }

        // Crash
        if !(self.crash.threshold_g > 0.0 && self.crash.threshold_g.is_finite()) {
            eyre::bail!("crash.threshold_g must be > 0");
        }
        if self.crash.reset_ms == 0 {
            eyre::bail!("crash.reset_ms must be >= 1");
        }
        require_period("crash.period_ms", self.crash.period_ms)?;

        // Door
        require_period("door.period_ms", self.door.period_ms)?;
        if self.door.debounce_count == 0 {
            eyre::bail!("door.debounce_count must be >= 1");
        }
        if self.door.queue_capacity == 0 {
            eyre::bail!("door.queue_capacity must be >= 1");
        }

        // Light
        require_period("light.period_ms", self.light.period_ms)?;
        if self.light.night_threshold_lux.is_sign_negative() {
            eyre::bail!("light.night_threshold_lux must be >= 0");
        }
        if self.light.hysteresis_factor < 1.0 {
            eyre::bail!("light.hysteresis_factor must be >= 1.0");
        }
        if self.light.day_threshold_lux * self.light.hysteresis_factor
            <= self.light.night_threshold_lux
        {
            eyre::bail!(
                "light.day_threshold_lux * hysteresis_factor must exceed night_threshold_lux"
            );
        }

        // Proximity
        require_period("proximity.period_ms", self.proximity.period_ms)?;
        let p = &self.proximity;
        if !(p.danger_cm < p.warning_cm && p.warning_cm < p.safe_cm) {
            eyre::bail!("proximity bands must be strictly increasing (danger < warning < safe)");
        }
        if p.safe_cm > p.max_cm {
            eyre::bail!("proximity.safe_cm must be <= proximity.max_cm");
        }

        // Hardware
        if self.hardware.ranging_timeout_ms == 0 {
            eyre::bail!("hardware.ranging_timeout_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").expect("parse empty");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.accel.period_ms, 200);
        assert_eq!(cfg.crash.reset_ms, 5000);
        assert_eq!(cfg.door.debounce_count, 3);
        assert_eq!(cfg.proximity.max_cm, 400);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = load_toml("[crash]\nthreshold_g = 2.5\n").expect("parse");
        assert_eq!(cfg.crash.threshold_g, 2.5);
        assert_eq!(cfg.crash.period_ms, 50);
    }
}
