//! Simulated sensors for bench runs and tests.
//!
//! Every simulator is deterministic: readings depend only on how many times
//! the sensor has been read, so a scenario replays identically.
use std::f64::consts::PI;
use std::io::Write;

use vehicle_traits::{
    Accelerometer, CrashNotifier, LightSensor, PresenceSensor, RangeFinder, RawSample,
};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reads an injected impact lasts. The device is shared by the sampler and
/// the crash detector, so a single-read spike could go to either one.
pub const IMPACT_SAMPLES: u64 = 4;

/// Repeating drive cycle: idle, accelerate forward, coast, brake.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveProfile {
    pub idle_samples: u64,
    pub accel_samples: u64,
    pub coast_samples: u64,
    pub brake_samples: u64,
    /// Longitudinal acceleration while accelerating or braking, in g.
    pub push_g: f32,
    /// Read index at which an impact starts; it lasts `IMPACT_SAMPLES` reads.
    pub crash_at: Option<u64>,
}

impl Default for DriveProfile {
    fn default() -> Self {
        Self {
            idle_samples: 10,
            accel_samples: 25,
            coast_samples: 25,
            brake_samples: 25,
            push_g: 0.3,
            crash_at: None,
        }
    }
}

impl DriveProfile {
    fn cycle_len(&self) -> u64 {
        (self.idle_samples + self.accel_samples + self.coast_samples + self.brake_samples).max(1)
    }

    /// Sample for read index `n`.
    pub fn sample(&self, n: u64) -> RawSample {
        if self
            .crash_at
            .is_some_and(|at| (at..at + IMPACT_SAMPLES).contains(&n))
        {
            return RawSample::new(3.5, 3.5, 3.5);
        }
        let mut pos = n % self.cycle_len();
        let y = if pos < self.idle_samples {
            0.0
        } else {
            pos -= self.idle_samples;
            if pos < self.accel_samples {
                self.push_g
            } else {
                pos -= self.accel_samples;
                if pos < self.coast_samples {
                    0.02
                } else {
                    -self.push_g
                }
            }
        };
        // Small lateral sway keeps the signal from being perfectly flat.
        let x = 0.01 * ((n as f32) * 0.3).sin();
        RawSample::new(x, y, 1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedAccelerometer {
    profile: DriveProfile,
    reads: u64,
}

impl SimulatedAccelerometer {
    pub fn new(profile: DriveProfile) -> Self {
        Self { profile, reads: 0 }
    }
}

impl Accelerometer for SimulatedAccelerometer {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        let s = self.profile.sample(self.reads);
        self.reads = self.reads.wrapping_add(1);
        tracing::trace!(x = s.x, y = s.y, z = s.z, "simulated accel");
        Ok(s)
    }
}

/// Door that alternates between closed (present) and open every
/// `toggle_every` reads, starting closed.
#[derive(Debug, Clone)]
pub struct SimulatedPresence {
    toggle_every: u64,
    reads: u64,
}

impl SimulatedPresence {
    pub fn new(toggle_every: u64) -> Self {
        Self {
            toggle_every: toggle_every.max(1),
            reads: 0,
        }
    }
}

impl PresenceSensor for SimulatedPresence {
    fn is_present(&mut self) -> Result<bool, BoxError> {
        let present = (self.reads / self.toggle_every) % 2 == 0;
        self.reads = self.reads.wrapping_add(1);
        Ok(present)
    }
}

/// Smooth day/night cycle between `night_lux` and `day_lux`, starting at
/// full daylight.
#[derive(Debug, Clone)]
pub struct SimulatedLight {
    day_lux: f64,
    night_lux: f64,
    cycle: u64,
    reads: u64,
}

impl SimulatedLight {
    pub fn new(day_lux: f64, night_lux: f64, cycle: u64) -> Self {
        Self {
            day_lux,
            night_lux,
            cycle: cycle.max(2),
            reads: 0,
        }
    }
}

impl LightSensor for SimulatedLight {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        let phase = (self.reads % self.cycle) as f64 / self.cycle as f64;
        self.reads = self.reads.wrapping_add(1);
        let k = 0.5 * (1.0 + (2.0 * PI * phase).cos());
        Ok(self.night_lux + (self.day_lux - self.night_lux) * k)
    }
}

/// Obstacle that approaches from `from_cm` to `to_cm` in `step_cm` steps,
/// then jumps back out.
#[derive(Debug, Clone)]
pub struct SimulatedRange {
    from_cm: u32,
    to_cm: u32,
    step_cm: u32,
    current: u32,
}

impl SimulatedRange {
    pub fn new(from_cm: u32, to_cm: u32, step_cm: u32) -> Self {
        Self {
            from_cm,
            to_cm: to_cm.min(from_cm),
            step_cm: step_cm.max(1),
            current: from_cm,
        }
    }
}

impl RangeFinder for SimulatedRange {
    fn measure_cm(&mut self, max_cm: u32) -> Result<u32, BoxError> {
        let d = self.current;
        self.current = if d <= self.to_cm {
            self.from_cm
        } else {
            d.saturating_sub(self.step_cm).max(self.to_cm)
        };
        if d > max_cm {
            return Err(Box::new(HwError::EchoTimeout));
        }
        Ok(d)
    }
}

/// Writes each crash timestamp as one line (serial console, log file, ...).
pub struct LineNotifier<W> {
    out: W,
}

impl<W: Write> LineNotifier<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CrashNotifier for LineNotifier<W> {
    fn notify(&mut self, formatted_timestamp: &str) -> Result<(), BoxError> {
        self.out
            .write_all(formatted_timestamp.as_bytes())
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush())
            .map_err(|e| Box::new(HwError::Io(e)) as BoxError)
    }
}
