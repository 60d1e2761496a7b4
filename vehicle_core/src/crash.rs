//! Crash detection.
//!
//! The detector samples the accelerometer directly (bypassing the low-pass
//! filter) and compares the gravity-compensated magnitude against a
//! threshold. The first exceedance latches; further exceedances are ignored
//! until a manual reset or the one-shot auto-reset timer clears the latch.
//!
//! State machine:
//!
//! ```text
//!   Idle --(adjusted > threshold)--> Latched
//!   Latched --(reset() | timer expiry)--> Idle
//! ```
use crate::config::CrashCfg;
use crate::error::CoreError;
use crate::hw_error::map_hw_error;
use crate::listener::ListenerSlot;
use crate::task::{TaskHandle, spawn_periodic};
use crate::timer::OneShotTimer;
use crate::util;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, UNIX_EPOCH};
use vehicle_traits::{Accelerometer, CrashNotifier, RawSample, clock::Clock};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H_%M_%S";

#[derive(Debug, Clone, PartialEq)]
pub struct CrashEvent {
    /// Gravity-compensated impact in g.
    pub impact_force: f32,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// `timestamp` rendered in UTC as `YYYY-MM-DD HH_MM_SS`.
    pub formatted_timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Idle,
    Latched,
}

/// Called synchronously on the detector's thread when a crash latches.
pub trait CrashListener: Send {
    fn on_crash(&mut self, event: &CrashEvent);
}

impl<F: FnMut(&CrashEvent) + Send> CrashListener for F {
    fn on_crash(&mut self, event: &CrashEvent) {
        self(event)
    }
}

/// Magnitude minus 1 g, floored at zero.
#[inline]
pub fn adjusted_impact(sample: &RawSample) -> f32 {
    let m = sample.magnitude();
    if m > 1.0 { m - 1.0 } else { 0.0 }
}

/// Render Unix seconds in UTC. Out-of-range values render as the epoch.
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

struct Latch {
    state: LatchState,
    last_event: Option<CrashEvent>,
    /// Incremented on every latch and reset; a timer only clears the latch
    /// generation it was armed for.
    generation: u64,
}

struct CrashShared {
    latch: Mutex<Latch>,
    detected: AtomicBool,
    threshold_bits: AtomicU32,
    listener: ListenerSlot<dyn CrashListener>,
    timer: Mutex<OneShotTimer>,
    reset_after: Duration,
}

impl CrashShared {
    fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold_bits.load(Ordering::Acquire))
    }

    fn expire(&self, generation: u64) {
        let mut l = self.latch.lock();
        if l.generation == generation && l.state == LatchState::Latched {
            l.state = LatchState::Idle;
            self.detected.store(false, Ordering::Release);
            tracing::info!("crash latch auto-reset");
        }
    }
}

/// Cloneable control and query handle for a `CrashDetector`.
#[derive(Clone)]
pub struct CrashHandle {
    shared: Arc<CrashShared>,
}

impl CrashHandle {
    pub fn is_crashed(&self) -> bool {
        self.shared.detected.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LatchState {
        self.shared.latch.lock().state
    }

    /// The latched event, or None when no crash is currently latched.
    pub fn last_event(&self) -> Option<CrashEvent> {
        let l = self.shared.latch.lock();
        match l.state {
            LatchState::Latched => l.last_event.clone(),
            LatchState::Idle => None,
        }
    }

    /// Clear the latch and cancel a pending auto-reset.
    pub fn reset(&self) {
        {
            let mut l = self.shared.latch.lock();
            l.state = LatchState::Idle;
            l.generation = l.generation.wrapping_add(1);
            self.shared.detected.store(false, Ordering::Release);
        }
        self.shared.timer.lock().cancel();
        tracing::info!("crash state reset");
    }

    /// Update the threshold. Values that are not strictly positive and finite
    /// are ignored with a warning and leave the threshold unchanged.
    pub fn set_threshold(&self, threshold_g: f32) {
        if !(threshold_g > 0.0 && threshold_g.is_finite()) {
            let err = CoreError::InvalidArgument("crash threshold must be > 0");
            tracing::warn!(error = %err, threshold_g, "crash threshold ignored");
            return;
        }
        self.shared
            .threshold_bits
            .store(threshold_g.to_bits(), Ordering::Release);
        tracing::info!(threshold_g, "crash threshold updated");
    }

    pub fn threshold(&self) -> f32 {
        self.shared.threshold()
    }

    /// Register the crash listener, replacing any previous one.
    pub fn register_callback<L: CrashListener + 'static>(&self, listener: L) {
        self.shared.listener.set(Box::new(listener));
    }

    pub(crate) fn register_boxed(&self, listener: Box<dyn CrashListener>) {
        self.shared.listener.set(listener);
    }

    pub fn clear_callback(&self) {
        self.shared.listener.clear();
    }
}

pub struct CrashDetector<A, C> {
    sensor: A,
    clock: C,
    cfg: CrashCfg,
    shared: Arc<CrashShared>,
    notifier: Option<Box<dyn CrashNotifier + Send>>,
}

impl<A: Accelerometer, C: Clock> CrashDetector<A, C> {
    pub fn new(sensor: A, clock: C, cfg: CrashCfg) -> Self {
        let shared = Arc::new(CrashShared {
            latch: Mutex::new(Latch {
                state: LatchState::Idle,
                last_event: None,
                generation: 0,
            }),
            detected: AtomicBool::new(false),
            threshold_bits: AtomicU32::new(cfg.threshold_g.to_bits()),
            listener: ListenerSlot::new(),
            timer: Mutex::new(OneShotTimer::new("crash-reset")),
            reset_after: Duration::from_millis(cfg.reset_ms),
        });
        Self {
            sensor,
            clock,
            cfg,
            shared,
            notifier: None,
        }
    }

    /// Attach the outbound sink notified with the formatted timestamp.
    pub fn with_notifier(mut self, notifier: Box<dyn CrashNotifier + Send>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn handle(&self) -> CrashHandle {
        CrashHandle {
            shared: self.shared.clone(),
        }
    }

    /// One detection period: read the sensor and evaluate the sample.
    pub fn tick(&mut self) -> Option<CrashEvent> {
        match self.sensor.read() {
            Ok(sample) => self.process(&sample),
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::warn!(error = %err, "crash detector read failed");
                None
            }
        }
    }

    /// Evaluate one raw sample; returns the event when this sample latched.
    pub fn process(&mut self, sample: &RawSample) -> Option<CrashEvent> {
        let adjusted = adjusted_impact(sample);
        if !adjusted.is_finite() {
            tracing::warn!(?sample, "non-finite acceleration sample; ignoring");
            return None;
        }
        let threshold = self.shared.threshold();
        if adjusted > threshold / 2.0 {
            tracing::debug!(adjusted, threshold, "high impact");
        }
        if adjusted <= threshold {
            return None;
        }

        let (event, generation) = {
            let mut l = self.shared.latch.lock();
            if l.state == LatchState::Latched {
                return None;
            }
            let timestamp = self
                .clock
                .wall_time()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
            let event = CrashEvent {
                impact_force: adjusted,
                timestamp,
                formatted_timestamp: format_timestamp(timestamp),
            };
            l.state = LatchState::Latched;
            l.last_event = Some(event.clone());
            l.generation = l.generation.wrapping_add(1);
            self.shared.detected.store(true, Ordering::Release);
            (event, l.generation)
        };
        tracing::warn!(
            impact_g = event.impact_force,
            at = %event.formatted_timestamp,
            "crash detected"
        );

        if let Some(n) = self.notifier.as_mut()
            && let Err(e) = n.notify(&event.formatted_timestamp)
        {
            tracing::warn!(error = %e, "crash notification failed");
        }

        self.shared.listener.dispatch(|l| l.on_crash(&event));
        self.arm_reset(generation);
        Some(event)
    }

    fn arm_reset(&self, generation: u64) {
        let weak: Weak<CrashShared> = Arc::downgrade(&self.shared);
        let armed = self
            .shared
            .timer
            .lock()
            .start(self.shared.reset_after, move || {
                if let Some(shared) = weak.upgrade() {
                    shared.expire(generation);
                }
            });
        if let Err(e) = armed {
            tracing::warn!(error = %e, "failed to arm crash auto-reset timer");
        }
    }
}

impl<A, C> CrashDetector<A, C>
where
    A: Accelerometer + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn spawn(mut self) -> std::io::Result<TaskHandle> {
        let period = util::period(self.cfg.period_ms);
        let clock = self.clock.clone();
        spawn_periodic("crash-detector", period, clock, move || {
            let _ = self.tick();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RawSample::new(0.0, 0.0, 1.0), 0.0)]
    #[case(RawSample::new(0.0, 0.0, 0.5), 0.0)]
    #[case(RawSample::new(0.0, 0.0, 3.0), 2.0)]
    #[case(RawSample::new(3.0, 4.0, 0.0), 4.0)]
    fn gravity_compensation(#[case] s: RawSample, #[case] want: f32) {
        assert!((adjusted_impact(&s) - want).abs() < 1e-6);
    }

    #[test]
    fn formats_utc_with_underscored_time() {
        assert_eq!(format_timestamp(1_712_342_400), "2024-04-05 18_40_00");
        assert_eq!(format_timestamp(0), "1970-01-01 00_00_00");
    }
}
