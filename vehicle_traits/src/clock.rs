use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Monotonic clock abstraction shared by every sampling loop.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - sleep_until(): absolute-deadline wait used for drift-free periodic wakeups
/// - wall_time(): calendar time used to stamp events for external consumers
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Sleep until `deadline`; returns immediately if the deadline already passed.
    fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now);
        }
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }

    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }

    #[inline]
    fn sleep_until(&self, deadline: Instant) {
        (**self).sleep_until(deadline)
    }

    #[inline]
    fn wall_time(&self) -> SystemTime {
        (**self).wall_time()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::UNIX_EPOCH;

    /// Wall-clock origin for test clocks: 2024-04-05 18:40:00 UTC.
    pub const DEFAULT_WALL_ORIGIN_S: u64 = 1_712_342_400;

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = origin + offset
    /// wall_time() = UNIX_EPOCH + wall_origin + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        wall_origin: Duration,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self::with_wall_origin(Duration::from_secs(DEFAULT_WALL_ORIGIN_S))
        }

        /// Test clock whose wall time starts `wall_origin` after the Unix epoch.
        pub fn with_wall_origin(wall_origin: Duration) -> Self {
            Self {
                origin: Instant::now(),
                wall_origin,
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Set the absolute offset relative to origin.
        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }

        fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }

        fn wall_time(&self) -> SystemTime {
            UNIX_EPOCH + self.wall_origin + self.offset()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn sleep_until_advances_to_deadline() {
        let clock = TestClock::new();
        let start = clock.now();
        clock.sleep_until(start + Duration::from_millis(250));
        assert_eq!(clock.ms_since(start), 250);
    }

    #[test]
    fn sleep_until_past_deadline_is_noop() {
        let clock = TestClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(100));
        clock.sleep_until(start + Duration::from_millis(40));
        assert_eq!(clock.ms_since(start), 100);
    }

    #[test]
    fn wall_time_tracks_offset() {
        let clock = TestClock::with_wall_origin(Duration::from_secs(10));
        clock.advance(Duration::from_secs(5));
        let secs = clock
            .wall_time()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(secs, 15);
    }
}
