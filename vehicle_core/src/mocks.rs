//! Test and helper sensors for vehicle_core.
//!
//! `Manual*` sensors are cloneable handles whose reading can be changed while
//! a task owns another clone. `Scripted*` sensors replay a fixed sequence and
//! then repeat the final entry.
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use vehicle_traits::{
    Accelerometer, CrashNotifier, LightSensor, PresenceSensor, RangeFinder, RawSample,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn offline() -> BoxError {
    Box::new(std::io::Error::other("sensor offline"))
}

/// Every read fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSensor;

impl Accelerometer for FailingSensor {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        Err(offline())
    }
}

impl PresenceSensor for FailingSensor {
    fn is_present(&mut self) -> Result<bool, BoxError> {
        Err(offline())
    }
}

impl LightSensor for FailingSensor {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        Err(offline())
    }
}

impl RangeFinder for FailingSensor {
    fn measure_cm(&mut self, _max_cm: u32) -> Result<u32, BoxError> {
        Err(offline())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualAccelerometer {
    sample: Arc<Mutex<RawSample>>,
}

impl ManualAccelerometer {
    pub fn new(sample: RawSample) -> Self {
        Self {
            sample: Arc::new(Mutex::new(sample)),
        }
    }

    pub fn set(&self, sample: RawSample) {
        *self.sample.lock() = sample;
    }
}

impl Accelerometer for ManualAccelerometer {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        Ok(*self.sample.lock())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualPresence {
    present: Arc<AtomicBool>,
}

impl ManualPresence {
    pub fn new(present: bool) -> Self {
        Self {
            present: Arc::new(AtomicBool::new(present)),
        }
    }

    pub fn set(&self, present: bool) {
        self.present.store(present, Ordering::Release);
    }
}

impl PresenceSensor for ManualPresence {
    fn is_present(&mut self) -> Result<bool, BoxError> {
        Ok(self.present.load(Ordering::Acquire))
    }
}

#[derive(Debug, Clone)]
pub struct ManualLight {
    lux_bits: Arc<AtomicU64>,
}

impl ManualLight {
    pub fn new(lux: f64) -> Self {
        Self {
            lux_bits: Arc::new(AtomicU64::new(lux.to_bits())),
        }
    }

    pub fn set(&self, lux: f64) {
        self.lux_bits.store(lux.to_bits(), Ordering::Release);
    }
}

impl LightSensor for ManualLight {
    fn read_lux(&mut self) -> Result<f64, BoxError> {
        Ok(f64::from_bits(self.lux_bits.load(Ordering::Acquire)))
    }
}

#[derive(Debug, Clone)]
pub struct ManualRange {
    cm: Arc<AtomicU32>,
    failing: Arc<AtomicBool>,
}

impl ManualRange {
    pub fn new(cm: u32) -> Self {
        Self {
            cm: Arc::new(AtomicU32::new(cm)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set(&self, cm: u32) {
        self.cm.store(cm, Ordering::Release);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl RangeFinder for ManualRange {
    fn measure_cm(&mut self, max_cm: u32) -> Result<u32, BoxError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(Box::new(std::io::Error::other("echo timeout")));
        }
        Ok(self.cm.load(Ordering::Acquire).min(max_cm))
    }
}

/// Replays `samples`, then repeats the last one. Empty scripts fail.
#[derive(Debug, Clone)]
pub struct ScriptedAccelerometer {
    samples: Vec<RawSample>,
    idx: usize,
}

impl ScriptedAccelerometer {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self { samples, idx: 0 }
    }
}

impl Accelerometer for ScriptedAccelerometer {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        let last = self.samples.len().checked_sub(1).ok_or_else(offline)?;
        let s = self.samples[self.idx.min(last)];
        self.idx = self.idx.saturating_add(1);
        Ok(s)
    }
}

/// Replays presence readings; `None` entries are read failures.
#[derive(Debug, Clone)]
pub struct ScriptedPresence {
    script: Vec<Option<bool>>,
    idx: usize,
}

impl ScriptedPresence {
    pub fn new(script: Vec<Option<bool>>) -> Self {
        Self { script, idx: 0 }
    }
}

impl PresenceSensor for ScriptedPresence {
    fn is_present(&mut self) -> Result<bool, BoxError> {
        let last = self.script.len().checked_sub(1).ok_or_else(offline)?;
        let r = self.script[self.idx.min(last)];
        self.idx = self.idx.saturating_add(1);
        r.ok_or_else(offline)
    }
}

/// Collects every notification line.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl CrashNotifier for RecordingNotifier {
    fn notify(&mut self, formatted_timestamp: &str) -> Result<(), BoxError> {
        self.lines.lock().push(format!("{formatted_timestamp}\n"));
        Ok(())
    }
}
