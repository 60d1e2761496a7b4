//! Speed and heading estimation from filtered acceleration.
//!
//! Speed is integrated from the horizontal magnitude with multiplicative
//! damping. A zero-velocity update forces speed to zero after a run of
//! stationary ticks, which bounds integration drift.
use crate::accel::{AccelState, SharedAccel};
use crate::config::SpeedCfg;
use crate::task::{TaskHandle, spawn_periodic};
use crate::util;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use vehicle_traits::clock::Clock;

const MPS_TO_KMH: f32 = 3.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Unknown = 0,
    Forward = 1,
    Backward = 2,
    Left = 3,
    Right = 4,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Forward => "Forward",
            Self::Backward => "Backward",
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Forward,
            2 => Self::Backward,
            3 => Self::Left,
            4 => Self::Right,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "forward" => Ok(Self::Forward),
            "backward" => Ok(Self::Backward),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedState {
    /// Always >= 0.
    pub speed_mps: f32,
    pub direction: Direction,
    pub stationary_count: u32,
}

/// Pure estimator: one `update` per period with the latest snapshot.
#[derive(Debug, Clone)]
pub struct SpeedModel {
    cfg: SpeedCfg,
    dt_s: f32,
    state: SpeedState,
}

impl SpeedModel {
    pub fn new(cfg: SpeedCfg) -> Self {
        Self {
            dt_s: util::period_secs(cfg.period_ms),
            cfg,
            state: SpeedState::default(),
        }
    }

    pub const fn state(&self) -> SpeedState {
        self.state
    }

    pub fn update(&mut self, snap: &AccelState) -> SpeedState {
        let mh = snap.magnitude_horizontal;
        if !mh.is_finite() {
            tracing::warn!(mh, "non-finite horizontal magnitude; skipping update");
            return self.state;
        }

        if mh < self.cfg.stationary_threshold_g {
            self.state.stationary_count = self.state.stationary_count.saturating_add(1);
            if self.state.stationary_count >= self.cfg.stationary_count {
                if self.state.speed_mps != 0.0 || self.state.direction != Direction::Unknown {
                    tracing::debug!("zero-velocity update");
                }
                self.state.speed_mps = 0.0;
                self.state.direction = Direction::Unknown;
            }
            return self.state;
        }

        self.state.stationary_count = 0;
        let integrated = (self.state.speed_mps + mh * self.dt_s) * self.cfg.damping;
        self.state.speed_mps = integrated.max(0.0);
        self.state.direction =
            classify_direction(snap.filtered_x, snap.filtered_y, self.cfg.dominant_axis_g)
                .unwrap_or(self.state.direction);
        self.state
    }
}

/// Dominant-axis heading, or None when no axis is decisive.
///
/// Positive x maps to Left, positive y to Forward. Exact ties between the
/// axes are not decisive.
pub fn classify_direction(x: f32, y: f32, dominant_g: f32) -> Option<Direction> {
    let (ax, ay) = (x.abs(), y.abs());
    if ax <= dominant_g && ay <= dominant_g {
        return None;
    }
    if ax > ay {
        Some(if x > 0.0 {
            Direction::Left
        } else {
            Direction::Right
        })
    } else if ay > ax {
        Some(if y > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        })
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct Published {
    speed_bits: AtomicU32,
    direction: AtomicU8,
}

/// Lock-free reader for the latest speed estimate.
#[derive(Debug, Clone, Default)]
pub struct SpeedReader {
    shared: Arc<Published>,
}

impl SpeedReader {
    pub fn speed_mps(&self) -> f32 {
        f32::from_bits(self.shared.speed_bits.load(Ordering::Acquire))
    }

    pub fn speed_kmh(&self) -> f32 {
        self.speed_mps() * MPS_TO_KMH
    }

    pub fn direction(&self) -> Direction {
        Direction::from_u8(self.shared.direction.load(Ordering::Acquire))
    }

    pub fn direction_string(&self) -> &'static str {
        self.direction().as_str()
    }

    pub fn is_moving_forward(&self) -> bool {
        self.direction() == Direction::Forward
    }

    pub fn is_moving_backward(&self) -> bool {
        self.direction() == Direction::Backward
    }

    fn store(&self, st: &SpeedState) {
        self.shared
            .speed_bits
            .store(st.speed_mps.to_bits(), Ordering::Release);
        self.shared
            .direction
            .store(st.direction as u8, Ordering::Release);
    }
}

/// Periodic task wrapper around `SpeedModel`.
pub struct SpeedEstimator {
    model: SpeedModel,
    source: SharedAccel,
    reader: SpeedReader,
}

impl SpeedEstimator {
    pub fn new(source: SharedAccel, cfg: SpeedCfg) -> Self {
        Self {
            model: SpeedModel::new(cfg),
            source,
            reader: SpeedReader::default(),
        }
    }

    pub fn reader(&self) -> SpeedReader {
        self.reader.clone()
    }

    /// One estimation period. Skips when no valid snapshot is available.
    pub fn tick(&mut self) -> Option<SpeedState> {
        let snap = match self.source.snapshot() {
            Ok(s) if s.valid => s,
            Ok(_) => {
                tracing::trace!("no acceleration sample yet");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "acceleration snapshot unavailable; skipping");
                return None;
            }
        };
        let st = self.model.update(&snap);
        self.reader.store(&st);
        Some(st)
    }

    pub fn spawn<C: Clock + Send + 'static>(mut self, clock: C) -> std::io::Result<TaskHandle> {
        let period = util::period(self.model.cfg.period_ms);
        spawn_periodic("speed-estimator", period, clock, move || {
            let _ = self.tick();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn snap(x: f32, y: f32) -> AccelState {
        AccelState {
            filtered_x: x,
            filtered_y: y,
            filtered_z: 1.0,
            magnitude_horizontal: (x * x + y * y).sqrt(),
            valid: true,
            ..AccelState::default()
        }
    }

    #[rstest]
    #[case(0.0, 0.5, Some(Direction::Forward))]
    #[case(0.0, -0.5, Some(Direction::Backward))]
    #[case(0.5, 0.1, Some(Direction::Left))]
    #[case(-0.5, 0.2, Some(Direction::Right))]
    #[case(0.05, 0.08, None)]
    #[case(0.3, 0.3, None)]
    fn dominant_axis_table(#[case] x: f32, #[case] y: f32, #[case] want: Option<Direction>) {
        assert_eq!(classify_direction(x, y, 0.1), want);
    }

    #[test]
    fn integrates_and_damps() {
        let mut m = SpeedModel::new(SpeedCfg::default());
        let st = m.update(&snap(0.0, 0.5));
        assert!((st.speed_mps - 0.049).abs() < 1e-6);
        assert_eq!(st.direction, Direction::Forward);
    }

    #[test]
    fn tie_keeps_previous_direction() {
        let mut m = SpeedModel::new(SpeedCfg::default());
        m.update(&snap(0.0, -0.4));
        let st = m.update(&snap(0.3, 0.3));
        assert_eq!(st.direction, Direction::Backward);
    }

    #[test]
    fn stationary_run_forces_zero() {
        let cfg = SpeedCfg::default();
        let mut m = SpeedModel::new(cfg);
        for _ in 0..5 {
            m.update(&snap(0.0, 0.5));
        }
        assert!(m.state().speed_mps > 0.0);
        for i in 1..cfg.stationary_count {
            let st = m.update(&snap(0.0, 0.01));
            assert_eq!(st.stationary_count, i);
            assert!(st.speed_mps > 0.0, "speed zeroed early at tick {i}");
        }
        let st = m.update(&snap(0.0, 0.01));
        assert_eq!(st.speed_mps, 0.0);
        assert_eq!(st.direction, Direction::Unknown);
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("BACKWARD".parse::<Direction>(), Ok(Direction::Backward));
        assert!("up".parse::<Direction>().is_err());
    }
}
