//! Acceleration provider.
//!
//! `AccelerationSampler` reads the accelerometer once per period, applies a
//! per-axis exponential low-pass filter and publishes an `AccelState` into a
//! lock-protected shared slot. Consumers take copies through `SharedAccel`.
//! Both sides use bounded lock waits: a publisher that cannot get the lock
//! drops that update, a reader that cannot get it receives `LockTimeout`.
use crate::config::AccelCfg;
use crate::error::CoreError;
use crate::hw_error::map_hw_error;
use crate::task::{TaskHandle, spawn_periodic};
use crate::util;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vehicle_traits::{Accelerometer, RawSample, clock::Clock};

/// Emit a debug line every this many samples.
const LOG_EVERY: u32 = 50;

/// Latest filtered acceleration, in g.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelState {
    pub raw: RawSample,
    pub filtered_x: f32,
    pub filtered_y: f32,
    pub filtered_z: f32,
    /// Norm of the filtered vector.
    pub magnitude: f32,
    /// Norm of the filtered x/y components.
    pub magnitude_horizontal: f32,
    /// Milliseconds since the sampler started.
    pub timestamp_ms: u64,
    /// False until the first successful sample.
    pub valid: bool,
    pub sample_count: u32,
}

/// Exponential smoothing applied independently to each axis.
///
/// `f = alpha * f + (1 - alpha) * raw`, seeded with zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPass3 {
    alpha: f32,
    state: [f32; 3],
}

impl LowPass3 {
    pub const fn new(alpha: f32) -> Self {
        Self {
            alpha,
            state: [0.0; 3],
        }
    }

    pub fn apply(&mut self, raw: &RawSample) -> [f32; 3] {
        let a = self.alpha;
        for (f, r) in self.state.iter_mut().zip([raw.x, raw.y, raw.z]) {
            *f = a * *f + (1.0 - a) * r;
        }
        self.state
    }
}

/// Reader side of the shared acceleration slot.
#[derive(Clone)]
pub struct SharedAccel {
    inner: Arc<Mutex<AccelState>>,
    read_timeout: Duration,
}

impl SharedAccel {
    fn new(read_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AccelState::default())),
            read_timeout,
        }
    }

    /// Copy of the latest state, waiting at most the configured read timeout.
    ///
    /// The copy may be `valid == false` if no sample has been published yet.
    pub fn snapshot(&self) -> Result<AccelState, CoreError> {
        self.snapshot_within(self.read_timeout)
    }

    pub fn snapshot_within(&self, timeout: Duration) -> Result<AccelState, CoreError> {
        self.inner
            .try_lock_for(timeout)
            .map(|g| *g)
            .ok_or(CoreError::LockTimeout)
    }

    fn publish(&self, state: &AccelState, timeout: Duration) -> Result<(), CoreError> {
        let mut g = self.inner.try_lock_for(timeout).ok_or(CoreError::LockTimeout)?;
        *g = *state;
        Ok(())
    }

    /// Hold the lock for `hold`; used to exercise the contention paths.
    #[cfg(test)]
    pub(crate) fn hold_for(&self, hold: Duration) {
        let _g = self.inner.lock();
        std::thread::sleep(hold);
    }
}

pub struct AccelerationSampler<A, C> {
    sensor: A,
    clock: C,
    epoch: Instant,
    cfg: AccelCfg,
    filter: LowPass3,
    local: AccelState,
    shared: SharedAccel,
}

impl<A: Accelerometer, C: Clock> AccelerationSampler<A, C> {
    pub fn new(sensor: A, clock: C, cfg: AccelCfg) -> Self {
        let epoch = clock.now();
        Self {
            sensor,
            clock,
            epoch,
            filter: LowPass3::new(cfg.alpha),
            local: AccelState::default(),
            shared: SharedAccel::new(cfg.read_timeout()),
            cfg,
        }
    }

    pub fn shared(&self) -> SharedAccel {
        self.shared.clone()
    }

    /// One sampling period: read, filter, publish.
    ///
    /// A failed read leaves the shared state untouched. A publish that misses
    /// its lock deadline is dropped; the next period publishes fresh data.
    pub fn tick(&mut self) -> Result<AccelState, CoreError> {
        let raw = match self.sensor.read() {
            Ok(s) if s.x.is_finite() && s.y.is_finite() && s.z.is_finite() => s,
            Ok(s) => {
                tracing::warn!(?s, "accelerometer returned non-finite sample; skipping");
                return Err(CoreError::SensorRead("non-finite sample".into()));
            }
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::warn!(error = %err, "accelerometer read failed");
                return Err(err);
            }
        };

        let [fx, fy, fz] = self.filter.apply(&raw);
        self.local = AccelState {
            raw,
            filtered_x: fx,
            filtered_y: fy,
            filtered_z: fz,
            magnitude: (fx * fx + fy * fy + fz * fz).sqrt(),
            magnitude_horizontal: (fx * fx + fy * fy).sqrt(),
            timestamp_ms: self.clock.ms_since(self.epoch),
            valid: true,
            sample_count: self.local.sample_count.wrapping_add(1),
        };

        if let Err(e) = self.shared.publish(&self.local, self.cfg.publish_timeout()) {
            tracing::warn!(error = %e, "dropping acceleration update");
            return Err(e);
        }

        if self.local.sample_count % LOG_EVERY == 0 {
            tracing::debug!(
                x = self.local.filtered_x,
                y = self.local.filtered_y,
                z = self.local.filtered_z,
                magnitude = self.local.magnitude,
                "acceleration"
            );
        }
        Ok(self.local)
    }
}

impl<A, C> AccelerationSampler<A, C>
where
    A: Accelerometer + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn spawn(mut self) -> std::io::Result<TaskHandle> {
        let period = util::period(self.cfg.period_ms);
        let clock = self.clock.clone();
        spawn_periodic("accel-sampler", period, clock, move || {
            let _ = self.tick();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingSensor, ScriptedAccelerometer};
    use vehicle_traits::clock::test_clock::TestClock;

    fn sampler(
        samples: Vec<RawSample>,
    ) -> AccelerationSampler<ScriptedAccelerometer, TestClock> {
        AccelerationSampler::new(
            ScriptedAccelerometer::new(samples),
            TestClock::new(),
            AccelCfg::default(),
        )
    }

    #[test]
    fn snapshot_invalid_before_first_sample() {
        let s = sampler(vec![RawSample::new(0.0, 0.0, 1.0)]);
        let snap = s.shared().snapshot().expect("lock");
        assert!(!snap.valid);
        assert_eq!(snap.sample_count, 0);
    }

    #[test]
    fn filter_converges_towards_constant_input() {
        let mut s = sampler(vec![RawSample::new(0.0, 0.0, 1.0)]);
        let first = s.tick().expect("tick");
        assert!((first.filtered_z - 0.2).abs() < 1e-6);
        for _ in 0..60 {
            s.tick().expect("tick");
        }
        let snap = s.shared().snapshot().expect("lock");
        assert!(snap.valid);
        assert_eq!(snap.sample_count, 61);
        assert!((snap.filtered_z - 1.0).abs() < 1e-3);
        assert!(snap.magnitude_horizontal.abs() < 1e-6);
        assert!((snap.magnitude - snap.filtered_z).abs() < 1e-6);
    }

    #[test]
    fn timestamps_follow_clock() {
        let clock = TestClock::new();
        let mut s = AccelerationSampler::new(
            ScriptedAccelerometer::new(vec![RawSample::new(0.0, 0.0, 1.0)]),
            clock.clone(),
            AccelCfg::default(),
        );
        clock.advance(Duration::from_millis(400));
        let st = s.tick().expect("tick");
        assert_eq!(st.timestamp_ms, 400);
    }

    #[test]
    fn read_error_leaves_state_untouched() {
        let mut s = AccelerationSampler::new(FailingSensor, TestClock::new(), AccelCfg::default());
        assert!(matches!(s.tick(), Err(CoreError::SensorRead(_))));
        assert!(!s.shared().snapshot().expect("lock").valid);
    }

    #[test]
    fn contended_lock_times_out_for_readers_and_writers() {
        let mut s = sampler(vec![RawSample::new(0.5, 0.0, 1.0)]);
        let shared = s.shared();
        let holder = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.hold_for(Duration::from_millis(120)))
        };
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(shared.snapshot(), Err(CoreError::LockTimeout));
        assert_eq!(s.tick(), Err(CoreError::LockTimeout));
        holder.join().expect("join");
        assert!(!shared.snapshot().expect("lock").valid);
        assert!(s.tick().is_ok());
        assert!(shared.snapshot().expect("lock").valid);
    }
}
