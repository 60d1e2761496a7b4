//! Parking proximity zones.
//!
//! Distance plus direction of travel selects a front or back zone:
//! moving forward uses the front ladder, anything else the back ladder.
use crate::config::ProximityCfg;
use crate::hw_error::map_hw_error;
use crate::listener::ListenerSlot;
use crate::speed::{Direction, SpeedReader};
use crate::task::{TaskHandle, spawn_periodic};
use crate::util;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use vehicle_traits::{RangeFinder, clock::Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ProximityZone {
    #[default]
    NoneNear = 0,
    FrontFar = 1,
    FrontMid = 2,
    FrontClose = 3,
    BackFar = 4,
    BackMid = 5,
    BackClose = 6,
}

impl ProximityZone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoneNear => "NoneNear",
            Self::FrontFar => "FrontFar",
            Self::FrontMid => "FrontMid",
            Self::FrontClose => "FrontClose",
            Self::BackFar => "BackFar",
            Self::BackMid => "BackMid",
            Self::BackClose => "BackClose",
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::FrontFar,
            2 => Self::FrontMid,
            3 => Self::FrontClose,
            4 => Self::BackFar,
            5 => Self::BackMid,
            6 => Self::BackClose,
            _ => Self::NoneNear,
        }
    }
}

impl std::fmt::Display for ProximityZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a distance and heading to a zone.
///
/// Bands are lower-inclusive: `d < danger` is close, `d < warning` medium,
/// `d < safe` far, anything else `NoneNear`.
pub fn classify(distance_cm: u32, direction: Direction, cfg: &ProximityCfg) -> ProximityZone {
    let front = direction == Direction::Forward;
    let band = if distance_cm < cfg.danger_cm {
        0
    } else if distance_cm < cfg.warning_cm {
        1
    } else if distance_cm < cfg.safe_cm {
        2
    } else {
        return ProximityZone::NoneNear;
    };
    match (front, band) {
        (true, 0) => ProximityZone::FrontClose,
        (true, 1) => ProximityZone::FrontMid,
        (true, _) => ProximityZone::FrontFar,
        (false, 0) => ProximityZone::BackClose,
        (false, 1) => ProximityZone::BackMid,
        (false, _) => ProximityZone::BackFar,
    }
}

/// Classifier that reports only zone changes.
#[derive(Debug, Clone)]
pub struct ProximityClassifier {
    cfg: ProximityCfg,
    last: Option<ProximityZone>,
}

impl ProximityClassifier {
    pub const fn new(cfg: ProximityCfg) -> Self {
        Self { cfg, last: None }
    }

    pub const fn last(&self) -> Option<ProximityZone> {
        self.last
    }

    pub fn update(&mut self, distance_cm: u32, direction: Direction) -> Option<ProximityZone> {
        let zone = classify(distance_cm, direction, &self.cfg);
        if self.last == Some(zone) {
            return None;
        }
        self.last = Some(zone);
        Some(zone)
    }
}

pub trait ProximityListener: Send {
    fn on_zone(&mut self, zone: ProximityZone, distance_cm: u32);
}

impl<F: FnMut(ProximityZone, u32) + Send> ProximityListener for F {
    fn on_zone(&mut self, zone: ProximityZone, distance_cm: u32) {
        self(zone, distance_cm)
    }
}

struct ProximityShared {
    zone: AtomicU8,
    distance_cm: AtomicU32,
    listener: ListenerSlot<dyn ProximityListener>,
}

#[derive(Clone)]
pub struct ProximityHandle {
    shared: Arc<ProximityShared>,
}

impl ProximityHandle {
    pub fn zone(&self) -> ProximityZone {
        ProximityZone::from_u8(self.shared.zone.load(Ordering::Acquire))
    }

    pub fn distance_cm(&self) -> u32 {
        self.shared.distance_cm.load(Ordering::Acquire)
    }

    pub fn register_callback<L: ProximityListener + 'static>(&self, listener: L) {
        self.shared.listener.set(Box::new(listener));
    }

    pub(crate) fn register_boxed(&self, listener: Box<dyn ProximityListener>) {
        self.shared.listener.set(listener);
    }

    pub fn clear_callback(&self) {
        self.shared.listener.clear();
    }
}

/// Periodic ranging task feeding the classifier with the current heading.
pub struct ProximityMonitor<R> {
    ranger: R,
    speed: SpeedReader,
    classifier: ProximityClassifier,
    cfg: ProximityCfg,
    shared: Arc<ProximityShared>,
}

impl<R: RangeFinder> ProximityMonitor<R> {
    pub fn new(ranger: R, speed: SpeedReader, cfg: ProximityCfg) -> Self {
        Self {
            ranger,
            speed,
            classifier: ProximityClassifier::new(cfg),
            shared: Arc::new(ProximityShared {
                zone: AtomicU8::new(ProximityZone::NoneNear as u8),
                distance_cm: AtomicU32::new(cfg.max_cm),
                listener: ListenerSlot::new(),
            }),
            cfg,
        }
    }

    pub fn handle(&self) -> ProximityHandle {
        ProximityHandle {
            shared: self.shared.clone(),
        }
    }

    /// One ranging period. A failed measurement counts as maximum range.
    pub fn tick(&mut self) -> Option<ProximityZone> {
        let distance = match self.ranger.measure_cm(self.cfg.max_cm) {
            Ok(d) => d.min(self.cfg.max_cm),
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::debug!(error = %err, "ranging failed; treating as max range");
                self.cfg.max_cm
            }
        };
        self.observe(distance, self.speed.direction())
    }

    pub fn observe(&mut self, distance_cm: u32, direction: Direction) -> Option<ProximityZone> {
        self.shared.distance_cm.store(distance_cm, Ordering::Release);
        let zone = self.classifier.update(distance_cm, direction)?;
        self.shared.zone.store(zone as u8, Ordering::Release);
        tracing::debug!(zone = %zone, distance_cm, "proximity zone changed");
        self.shared.listener.dispatch(|l| l.on_zone(zone, distance_cm));
        Some(zone)
    }
}

impl<R: RangeFinder + Send + 'static> ProximityMonitor<R> {
    pub fn spawn<C: Clock + Send + 'static>(mut self, clock: C) -> std::io::Result<TaskHandle> {
        let period = util::period(self.cfg.period_ms);
        spawn_periodic("proximity", period, clock, move || {
            let _ = self.tick();
        })
    }
}
