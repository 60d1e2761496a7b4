//! Controller facade: owns the periodic tasks and exposes the query and
//! control surface over their shared state.
use crate::accel::{AccelState, AccelerationSampler, SharedAccel};
use crate::config::CoreConfig;
use crate::crash::{CrashDetector, CrashEvent, CrashHandle, CrashListener};
use crate::door::{DoorEvent, DoorHandle, DoorListener, DoorState, DoorStateMachine};
use crate::error::{BuildError, CoreError, Result};
use crate::light::{DayNightStateMachine, LightHandle, LightListener, LightState};
use crate::proximity::{ProximityHandle, ProximityListener, ProximityMonitor, ProximityZone, classify};
use crate::speed::{Direction, SpeedEstimator, SpeedReader};
use crate::status::Status;
use crate::task::TaskHandle;
use std::sync::Arc;
use std::time::Duration;
use vehicle_traits::clock::{Clock, MonotonicClock};
use vehicle_traits::{Accelerometer, CrashNotifier, LightSensor, PresenceSensor, RangeFinder};

type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Builder for `Controller`. Every sensor is required; the notifier, the
/// clock and the listeners are optional.
///
/// Listeners given here are installed before any task starts, so they also
/// see the first transitions (e.g. the initial day/night classification).
#[derive(Default)]
pub struct ControllerBuilder {
    accelerometer: Option<Box<dyn Accelerometer + Send>>,
    presence: Option<Box<dyn PresenceSensor + Send>>,
    light: Option<Box<dyn LightSensor + Send>>,
    ranger: Option<Box<dyn RangeFinder + Send>>,
    notifier: Option<Box<dyn CrashNotifier + Send>>,
    clock: Option<SharedClock>,
    config: CoreConfig,
    crash_listener: Option<Box<dyn CrashListener>>,
    door_listener: Option<Box<dyn DoorListener>>,
    light_listener: Option<Box<dyn LightListener>>,
    proximity_listener: Option<Box<dyn ProximityListener>>,
}

impl ControllerBuilder {
    pub fn with_accelerometer(mut self, a: impl Accelerometer + Send + 'static) -> Self {
        self.accelerometer = Some(Box::new(a));
        self
    }

    pub fn with_presence_sensor(mut self, p: impl PresenceSensor + Send + 'static) -> Self {
        self.presence = Some(Box::new(p));
        self
    }

    pub fn with_light_sensor(mut self, l: impl LightSensor + Send + 'static) -> Self {
        self.light = Some(Box::new(l));
        self
    }

    pub fn with_range_finder(mut self, r: impl RangeFinder + Send + 'static) -> Self {
        self.ranger = Some(Box::new(r));
        self
    }

    pub fn with_notifier(mut self, n: impl CrashNotifier + Send + 'static) -> Self {
        self.notifier = Some(Box::new(n));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub const fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_crash_callback<L: CrashListener + 'static>(mut self, listener: L) -> Self {
        self.crash_listener = Some(Box::new(listener));
        self
    }

    pub fn with_door_callback<L: DoorListener + 'static>(mut self, listener: L) -> Self {
        self.door_listener = Some(Box::new(listener));
        self
    }

    pub fn with_light_callback<L: LightListener + 'static>(mut self, listener: L) -> Self {
        self.light_listener = Some(Box::new(listener));
        self
    }

    pub fn with_proximity_callback<L: ProximityListener + 'static>(mut self, listener: L) -> Self {
        self.proximity_listener = Some(Box::new(listener));
        self
    }

    /// Validate, wire the subsystems together and start every task.
    pub fn try_start(self) -> Result<Controller> {
        self.config.validate()?;
        let accelerometer = self
            .accelerometer
            .ok_or(BuildError::MissingAccelerometer)?;
        let presence = self.presence.ok_or(BuildError::MissingPresenceSensor)?;
        let light = self.light.ok_or(BuildError::MissingLightSensor)?;
        let ranger = self.ranger.ok_or(BuildError::MissingRangeFinder)?;
        let clock: SharedClock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let cfg = self.config;

        // The sampler and the crash detector read the same device.
        let accelerometer = Arc::new(std::sync::Mutex::new(accelerometer));

        let sampler = AccelerationSampler::new(accelerometer.clone(), clock.clone(), cfg.accel);
        let accel = sampler.shared();
        let estimator = SpeedEstimator::new(accel.clone(), cfg.speed);
        let speed = estimator.reader();
        let mut detector = CrashDetector::new(accelerometer, clock.clone(), cfg.crash);
        if let Some(n) = self.notifier {
            detector = detector.with_notifier(n);
        }
        let crash = detector.handle();
        let door_sm = DoorStateMachine::new(presence, clock.clone(), cfg.door);
        let door = door_sm.handle();
        let light_sm = DayNightStateMachine::new(light, cfg.light);
        let light = light_sm.handle();
        let monitor = ProximityMonitor::new(ranger, speed.clone(), cfg.proximity);
        let proximity = monitor.handle();

        if let Some(l) = self.crash_listener {
            crash.register_boxed(l);
        }
        if let Some(l) = self.door_listener {
            door.register_boxed(l);
        }
        if let Some(l) = self.light_listener {
            light.register_boxed(l);
        }
        if let Some(l) = self.proximity_listener {
            proximity.register_boxed(l);
        }

        let spawn_err = |task: &'static str| {
            move |e: std::io::Error| BuildError::Spawn {
                task,
                reason: e.to_string(),
            }
        };
        let tasks = vec![
            sampler.spawn().map_err(spawn_err("accel-sampler"))?,
            estimator
                .spawn(clock.clone())
                .map_err(spawn_err("speed-estimator"))?,
            detector.spawn().map_err(spawn_err("crash-detector"))?,
            door_sm.spawn().map_err(spawn_err("door-monitor"))?,
            light_sm.spawn(clock.clone()).map_err(spawn_err("day-night"))?,
            monitor.spawn(clock).map_err(spawn_err("proximity"))?,
        ];
        tracing::info!(tasks = tasks.len(), "controller started");

        Ok(Controller {
            cfg,
            accel,
            speed,
            crash,
            door,
            light,
            proximity,
            tasks,
        })
    }
}

pub struct Controller {
    cfg: CoreConfig,
    accel: SharedAccel,
    speed: SpeedReader,
    crash: CrashHandle,
    door: DoorHandle,
    light: LightHandle,
    proximity: ProximityHandle,
    tasks: Vec<TaskHandle>,
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    pub const fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // Acceleration

    pub fn accel_snapshot(&self) -> std::result::Result<AccelState, CoreError> {
        self.accel.snapshot()
    }

    // Speed

    pub fn speed_mps(&self) -> f32 {
        self.speed.speed_mps()
    }

    pub fn speed_kmh(&self) -> f32 {
        self.speed.speed_kmh()
    }

    pub fn direction(&self) -> Direction {
        self.speed.direction()
    }

    pub fn direction_string(&self) -> &'static str {
        self.speed.direction_string()
    }

    pub fn is_moving_forward(&self) -> bool {
        self.speed.is_moving_forward()
    }

    pub fn is_moving_backward(&self) -> bool {
        self.speed.is_moving_backward()
    }

    // Crash

    pub fn is_crashed(&self) -> bool {
        self.crash.is_crashed()
    }

    pub fn last_crash_event(&self) -> Option<CrashEvent> {
        self.crash.last_event()
    }

    pub fn reset_crash(&self) {
        self.crash.reset();
    }

    /// Non-positive or non-finite values are ignored.
    pub fn set_crash_threshold(&self, threshold_g: f32) {
        self.crash.set_threshold(threshold_g);
    }

    pub fn crash_threshold(&self) -> f32 {
        self.crash.threshold()
    }

    pub fn register_crash_callback<L: CrashListener + 'static>(&self, listener: L) {
        self.crash.register_callback(listener);
    }

    // Door

    pub fn door_state(&self) -> DoorState {
        self.door.current_state()
    }

    pub fn is_door_open(&self) -> bool {
        self.door.is_open()
    }

    pub fn is_door_closed(&self) -> bool {
        self.door.is_closed()
    }

    pub fn poll_door_event(&self, timeout: Duration) -> Option<DoorEvent> {
        self.door.poll_event(timeout)
    }

    pub fn register_door_callback<L: DoorListener + 'static>(&self, listener: L) {
        self.door.register_callback(listener);
    }

    // Light

    pub fn light_state(&self) -> LightState {
        self.light.current_state()
    }

    pub fn current_lux(&self) -> f64 {
        self.light.current_lux()
    }

    pub fn is_day(&self) -> bool {
        self.light.is_day()
    }

    pub fn is_night(&self) -> bool {
        self.light.is_night()
    }

    pub fn register_light_callback<L: LightListener + 'static>(&self, listener: L) {
        self.light.register_callback(listener);
    }

    // Proximity

    /// Classify with the controller's configured bands.
    pub fn proximity_zone(&self, distance_cm: u32, direction: Direction) -> ProximityZone {
        classify(distance_cm, direction, &self.cfg.proximity)
    }

    /// Zone last reported by the ranging task.
    pub fn proximity(&self) -> ProximityZone {
        self.proximity.zone()
    }

    pub fn distance_cm(&self) -> u32 {
        self.proximity.distance_cm()
    }

    pub fn register_proximity_callback<L: ProximityListener + 'static>(&self, listener: L) {
        self.proximity.register_callback(listener);
    }

    // Introspection

    pub fn status(&self) -> Status {
        Status {
            accel: self.accel.snapshot().ok(),
            speed_kmh: self.speed_kmh(),
            direction: self.direction(),
            crashed: self.is_crashed(),
            last_crash: self.last_crash_event(),
            crash_threshold_g: self.crash_threshold(),
            door: self.door_state(),
            light: self.light_state(),
            lux: self.current_lux(),
            zone: self.proximity(),
            distance_cm: self.distance_cm(),
        }
    }

    /// Completed ticks per task, in start order.
    pub fn task_ticks(&self) -> Vec<(&'static str, u64)> {
        self.tasks.iter().map(|t| (t.name(), t.ticks())).collect()
    }

    /// Stop every task and wait for it. Returns false if any task panicked.
    pub fn shutdown(mut self) -> bool {
        let mut clean = true;
        while let Some(t) = self.tasks.pop() {
            clean &= t.stop();
        }
        tracing::info!(clean, "controller stopped");
        clean
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("tasks", &self.tasks)
            .field("crashed", &self.is_crashed())
            .field("door", &self.door_state())
            .field("light", &self.light_state())
            .finish_non_exhaustive()
    }
}
