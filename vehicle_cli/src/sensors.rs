//! Sensor wiring for the CLI: GPIO drivers where configured (feature
//! `hardware`), deterministic simulators everywhere else.

use eyre::WrapErr;
use vehicle_config::Config;
use vehicle_hardware::{
    DriveProfile, LineNotifier, SimulatedAccelerometer, SimulatedLight, SimulatedPresence,
    SimulatedRange,
};
use vehicle_traits::{Accelerometer, CrashNotifier, LightSensor, PresenceSensor, RangeFinder};

/// Reads between simulated door toggles.
const SIM_DOOR_TOGGLE: u64 = 40;
const SIM_DAY_LUX: f64 = 400.0;
const SIM_NIGHT_LUX: f64 = 2.0;
/// Reads per simulated day/night cycle.
const SIM_LIGHT_CYCLE: u64 = 40;
const SIM_RANGE_NEAR_CM: u32 = 10;
const SIM_RANGE_STEP_CM: u32 = 10;

pub struct SensorSet {
    pub accelerometer: Box<dyn Accelerometer + Send>,
    pub presence: Box<dyn PresenceSensor + Send>,
    pub light: Box<dyn LightSensor + Send>,
    pub ranger: Box<dyn RangeFinder + Send>,
    pub notifier: Option<Box<dyn CrashNotifier + Send>>,
}

pub fn build(cfg: &Config, sim_crash_at: Option<u64>) -> eyre::Result<SensorSet> {
    let profile = DriveProfile {
        crash_at: sim_crash_at,
        ..DriveProfile::default()
    };
    let notifier = match cfg.hardware.notifier_path.as_deref() {
        Some(path) => {
            let out = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("open crash notifier {path}"))?;
            Some(Box::new(LineNotifier::new(out)) as Box<dyn CrashNotifier + Send>)
        }
        None => None,
    };

    Ok(SensorSet {
        accelerometer: Box::new(SimulatedAccelerometer::new(profile)),
        presence: presence(cfg)?,
        light: Box::new(SimulatedLight::new(SIM_DAY_LUX, SIM_NIGHT_LUX, SIM_LIGHT_CYCLE)),
        ranger: ranger(cfg)?,
        notifier,
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn presence(cfg: &Config) -> eyre::Result<Box<dyn PresenceSensor + Send>> {
    let hw = &cfg.hardware;
    if let Some(pin) = hw.presence_pin {
        let p = vehicle_hardware::gpio::GpioPresence::new(pin, hw.presence_active_low)
            .wrap_err_with(|| format!("open presence pin {pin}"))?;
        return Ok(Box::new(p));
    }
    Ok(Box::new(SimulatedPresence::new(SIM_DOOR_TOGGLE)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn presence(_cfg: &Config) -> eyre::Result<Box<dyn PresenceSensor + Send>> {
    Ok(Box::new(SimulatedPresence::new(SIM_DOOR_TOGGLE)))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn ranger(cfg: &Config) -> eyre::Result<Box<dyn RangeFinder + Send>> {
    let hw = &cfg.hardware;
    if let (Some(trig), Some(echo)) = (hw.ultrasonic_trigger_pin, hw.ultrasonic_echo_pin) {
        let timeout = std::time::Duration::from_millis(hw.ranging_timeout_ms);
        let r = vehicle_hardware::gpio::UltrasonicRanger::new(trig, echo, timeout)
            .wrap_err_with(|| format!("open ultrasonic pins trig={trig} echo={echo}"))?;
        return Ok(Box::new(r));
    }
    Ok(simulated_ranger(cfg))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn ranger(cfg: &Config) -> eyre::Result<Box<dyn RangeFinder + Send>> {
    Ok(simulated_ranger(cfg))
}

fn simulated_ranger(cfg: &Config) -> Box<dyn RangeFinder + Send> {
    // Start just outside the safe band so every zone is crossed.
    let far = cfg.proximity.safe_cm.saturating_add(SIM_RANGE_STEP_CM);
    Box::new(SimulatedRange::new(far, SIM_RANGE_NEAR_CM, SIM_RANGE_STEP_CM))
}
