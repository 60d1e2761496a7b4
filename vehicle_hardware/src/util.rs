use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Speed of sound round trip: one centimetre of range per ~58 µs of echo.
pub const ECHO_US_PER_CM: u64 = 58;

/// Wait until `level()` equals `want`, or time out with `EchoTimeout`.
///
/// Returns the instant the level was observed. A zero `poll_interval` spins,
/// which echo timing needs for microsecond resolution.
pub fn wait_for_level_with_timeout(
    mut level: impl FnMut() -> bool,
    want: bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        if level() == want {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Convert an echo pulse width to centimetres, saturating at `max_cm`.
pub fn echo_to_cm(pulse: Duration, max_cm: u32) -> u32 {
    let us = u64::try_from(pulse.as_micros()).unwrap_or(u64::MAX);
    u32::try_from(us / ECHO_US_PER_CM).map_or(max_cm, |cm| cm.min(max_cm))
}
