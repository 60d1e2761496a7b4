//! Common time/period helpers for vehicle_core.
use std::time::{Duration, Instant};

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Period for a millisecond setting, clamped to at least 1 ms.
#[inline]
pub fn period(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

/// Period in seconds as f32, used as the integration step.
#[inline]
pub fn period_secs(ms: u64) -> f32 {
    ms.max(1) as f32 / MILLIS_PER_SEC as f32
}

/// Absolute-deadline pacing for periodic loops.
///
/// Deadlines advance by exactly one period, so jitter in the work itself never
/// accumulates. When the loop overruns by a full period or more, the schedule
/// re-anchors on the current time instead of bursting to catch up.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    next: Instant,
    overruns: u64,
}

impl Pacer {
    pub fn new(start: Instant, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next: start + period,
            overruns: 0,
        }
    }

    /// Deadline for the upcoming wake-up, given the current time.
    pub fn next_deadline(&mut self, now: Instant) -> Instant {
        if now >= self.next + self.period {
            let late = now - self.next;
            let missed = late.as_nanos() / self.period.as_nanos().max(1);
            self.overruns = self
                .overruns
                .saturating_add(u64::try_from(missed).unwrap_or(u64::MAX));
            tracing::trace!(missed = %missed, "periodic loop overran; re-anchoring");
            self.next = now;
        }
        let deadline = self.next;
        self.next += self.period;
        deadline
    }

    /// Periods skipped because the loop overran.
    pub const fn overruns(&self) -> u64 {
        self.overruns
    }

    pub const fn period(&self) -> Duration {
        self.period
    }
}
