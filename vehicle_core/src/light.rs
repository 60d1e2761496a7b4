//! Day/night classification with hysteresis over a short lux average.
use crate::config::LightCfg;
use crate::error::CoreError;
use crate::hw_error::map_hw_error;
use crate::listener::ListenerSlot;
use crate::task::{TaskHandle, spawn_periodic};
use crate::util;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use vehicle_traits::{LightSensor, clock::Clock};

/// Samples in the moving average.
pub const LUX_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum LightState {
    #[default]
    Unknown = 0,
    Day = 1,
    Night = 2,
    Transition = 3,
}

impl LightState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Day => "Day",
            Self::Night => "Night",
            Self::Transition => "Transition",
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Day,
            2 => Self::Night,
            3 => Self::Transition,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for LightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait LightListener: Send {
    fn on_light(&mut self, state: LightState);
}

impl<F: FnMut(LightState) + Send> LightListener for F {
    fn on_light(&mut self, state: LightState) {
        self(state)
    }
}

/// Fixed-size ring of recent lux readings.
///
/// The average covers only the samples collected so far, so start-up does not
/// read as darkness.
#[derive(Debug, Clone, Default)]
pub struct LuxWindow {
    samples: [f64; LUX_WINDOW],
    next: usize,
    filled: usize,
}

impl LuxWindow {
    pub fn push(&mut self, lux: f64) -> f64 {
        self.samples[self.next] = lux;
        self.next = (self.next + 1) % LUX_WINDOW;
        self.filled = (self.filled + 1).min(LUX_WINDOW);
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.filled == 0 {
            return 0.0;
        }
        self.samples[..self.filled].iter().sum::<f64>() / self.filled as f64
    }

    pub const fn len(&self) -> usize {
        self.filled
    }

    pub const fn is_empty(&self) -> bool {
        self.filled == 0
    }
}

/// Pure hysteresis classifier over the windowed average.
#[derive(Debug, Clone)]
pub struct DayNightModel {
    cfg: LightCfg,
    window: LuxWindow,
    state: LightState,
}

impl DayNightModel {
    pub fn new(cfg: LightCfg) -> Self {
        Self {
            cfg,
            window: LuxWindow::default(),
            state: LightState::Unknown,
        }
    }

    pub const fn state(&self) -> LightState {
        self.state
    }

    /// Feed a reading; returns the new state when it changed.
    pub fn update(&mut self, lux: f64) -> Option<LightState> {
        let avg = self.window.push(lux);
        let night = self.cfg.night_threshold_lux;
        let next = match self.state {
            LightState::Day if avg < night => LightState::Night,
            LightState::Night if avg > self.cfg.day_enter_lux() => LightState::Day,
            LightState::Day | LightState::Night => self.state,
            LightState::Unknown | LightState::Transition => {
                if avg < night {
                    LightState::Night
                } else {
                    LightState::Day
                }
            }
        };
        if next == self.state {
            return None;
        }
        tracing::info!(from = %self.state, to = %next, avg_lux = avg, "light state changed");
        self.state = next;
        Some(next)
    }
}

struct LightShared {
    state: AtomicU8,
    lux_bits: AtomicU64,
    listener: ListenerSlot<dyn LightListener>,
}

#[derive(Clone)]
pub struct LightHandle {
    shared: Arc<LightShared>,
}

impl LightHandle {
    pub fn current_state(&self) -> LightState {
        LightState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_day(&self) -> bool {
        self.current_state() == LightState::Day
    }

    pub fn is_night(&self) -> bool {
        self.current_state() == LightState::Night
    }

    /// Most recent raw reading; retained across read failures.
    pub fn current_lux(&self) -> f64 {
        f64::from_bits(self.shared.lux_bits.load(Ordering::Acquire))
    }

    pub fn register_callback<L: LightListener + 'static>(&self, listener: L) {
        self.shared.listener.set(Box::new(listener));
    }

    pub(crate) fn register_boxed(&self, listener: Box<dyn LightListener>) {
        self.shared.listener.set(listener);
    }

    pub fn clear_callback(&self) {
        self.shared.listener.clear();
    }
}

pub struct DayNightStateMachine<L> {
    sensor: L,
    model: DayNightModel,
    period_ms: u64,
    shared: Arc<LightShared>,
}

impl<L: LightSensor> DayNightStateMachine<L> {
    pub fn new(sensor: L, cfg: LightCfg) -> Self {
        Self {
            sensor,
            period_ms: cfg.period_ms,
            model: DayNightModel::new(cfg),
            shared: Arc::new(LightShared {
                state: AtomicU8::new(LightState::Unknown as u8),
                lux_bits: AtomicU64::new(0.0_f64.to_bits()),
                listener: ListenerSlot::new(),
            }),
        }
    }

    pub fn handle(&self) -> LightHandle {
        LightHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn tick(&mut self) -> Option<LightState> {
        let lux = match self.sensor.read_lux() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            Ok(v) => {
                let err = CoreError::SensorRead(format!("implausible lux value {v}"));
                tracing::warn!(error = %err, "light read rejected");
                return None;
            }
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::warn!(error = %err, "light read failed");
                return None;
            }
        };
        self.observe(lux)
    }

    /// Feed one lux reading.
    pub fn observe(&mut self, lux: f64) -> Option<LightState> {
        self.shared.lux_bits.store(lux.to_bits(), Ordering::Release);
        let changed = self.model.update(lux)?;
        self.shared.state.store(changed as u8, Ordering::Release);
        self.shared.listener.dispatch(|l| l.on_light(changed));
        Some(changed)
    }
}

impl<L: LightSensor + Send + 'static> DayNightStateMachine<L> {
    pub fn spawn<C: Clock + Send + 'static>(mut self, clock: C) -> std::io::Result<TaskHandle> {
        let period = util::period(self.period_ms);
        spawn_periodic("day-night", period, clock, move || {
            let _ = self.tick();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_averages_filled_samples_only() {
        let mut w = LuxWindow::default();
        assert!(w.is_empty());
        assert_eq!(w.push(100.0), 100.0);
        assert_eq!(w.push(50.0), 75.0);
        for _ in 0..5 {
            w.push(10.0);
        }
        assert_eq!(w.len(), LUX_WINDOW);
        assert_eq!(w.average(), 10.0);
    }

    #[test]
    fn unknown_resolves_on_first_sample() {
        let mut m = DayNightModel::new(LightCfg::default());
        assert_eq!(m.update(30.0), Some(LightState::Day));
        let mut m = DayNightModel::new(LightCfg::default());
        assert_eq!(m.update(3.0), Some(LightState::Night));
    }

    #[test]
    fn night_needs_average_above_scaled_day_threshold() {
        let mut m = DayNightModel::new(LightCfg::default());
        for _ in 0..5 {
            m.update(2.0);
        }
        assert_eq!(m.state(), LightState::Night);
        for _ in 0..5 {
            m.update(70.0);
        }
        assert_eq!(m.state(), LightState::Night, "70 lux is inside the band");
        let mut changed = None;
        for _ in 0..5 {
            changed = changed.or(m.update(200.0));
        }
        assert_eq!(changed, Some(LightState::Day));
    }
}
