//! Debounced door state.
//!
//! A presence reading of "present" means the door is closed. A new state is
//! committed only after `debounce_count` consecutive identical readings that
//! differ from the committed state. Each commit is pushed into a bounded
//! event queue without blocking and handed to the registered listener.
use crate::config::DoorCfg;
use crate::error::CoreError;
use crate::hw_error::map_hw_error;
use crate::listener::ListenerSlot;
use crate::task::{TaskHandle, spawn_periodic};
use crate::util;
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use vehicle_traits::{PresenceSensor, clock::Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DoorState {
    #[default]
    Unknown = 0,
    Open = 1,
    Closed = 2,
}

impl DoorState {
    pub const fn from_presence(present: bool) -> Self {
        if present { Self::Closed } else { Self::Open }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Open,
            2 => Self::Closed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorEvent {
    pub state: DoorState,
    /// Milliseconds since the door task started.
    pub timestamp_ms: u64,
}

pub trait DoorListener: Send {
    fn on_door(&mut self, event: &DoorEvent);
}

impl<F: FnMut(&DoorEvent) + Send> DoorListener for F {
    fn on_door(&mut self, event: &DoorEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    Stable,
    Pending { candidate: bool, count: u8 },
}

/// Consecutive-sample debounce over a boolean input.
#[derive(Debug, Clone)]
pub struct Debouncer {
    committed: Option<bool>,
    phase: DebouncePhase,
    required: u8,
}

impl Debouncer {
    pub fn new(required: u8) -> Self {
        Self {
            committed: None,
            phase: DebouncePhase::Stable,
            required: required.max(1),
        }
    }

    pub const fn committed(&self) -> Option<bool> {
        self.committed
    }

    pub const fn phase(&self) -> DebouncePhase {
        self.phase
    }

    /// Feed one reading; returns the new value when it is committed.
    pub fn observe(&mut self, reading: bool) -> Option<bool> {
        if self.committed == Some(reading) {
            self.phase = DebouncePhase::Stable;
            return None;
        }
        let count = match self.phase {
            DebouncePhase::Pending { candidate, count } if candidate == reading => {
                count.saturating_add(1)
            }
            _ => 1,
        };
        if count >= self.required {
            self.committed = Some(reading);
            self.phase = DebouncePhase::Stable;
            Some(reading)
        } else {
            self.phase = DebouncePhase::Pending {
                candidate: reading,
                count,
            };
            None
        }
    }
}

struct DoorShared {
    state: AtomicU8,
    listener: ListenerSlot<dyn DoorListener>,
    events: xch::Receiver<DoorEvent>,
}

/// Cloneable query handle. All clones drain the same event queue.
#[derive(Clone)]
pub struct DoorHandle {
    shared: Arc<DoorShared>,
}

impl DoorHandle {
    pub fn current_state(&self) -> DoorState {
        DoorState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.current_state() == DoorState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.current_state() == DoorState::Closed
    }

    /// Dequeue the oldest pending event, waiting up to `timeout`.
    /// A zero timeout polls without blocking.
    pub fn poll_event(&self, timeout: Duration) -> Option<DoorEvent> {
        if timeout.is_zero() {
            self.shared.events.try_recv().ok()
        } else {
            self.shared.events.recv_timeout(timeout).ok()
        }
    }

    pub fn pending_events(&self) -> usize {
        self.shared.events.len()
    }

    pub fn register_callback<L: DoorListener + 'static>(&self, listener: L) {
        self.shared.listener.set(Box::new(listener));
    }

    pub(crate) fn register_boxed(&self, listener: Box<dyn DoorListener>) {
        self.shared.listener.set(listener);
    }

    pub fn clear_callback(&self) {
        self.shared.listener.clear();
    }
}

pub struct DoorStateMachine<P, C> {
    sensor: P,
    clock: C,
    epoch: Instant,
    cfg: DoorCfg,
    debouncer: Debouncer,
    tx: xch::Sender<DoorEvent>,
    shared: Arc<DoorShared>,
}

impl<P: PresenceSensor, C: Clock> DoorStateMachine<P, C> {
    pub fn new(sensor: P, clock: C, cfg: DoorCfg) -> Self {
        let (tx, rx) = xch::bounded(cfg.queue_capacity.max(1));
        let epoch = clock.now();
        Self {
            sensor,
            clock,
            epoch,
            debouncer: Debouncer::new(cfg.debounce_count),
            cfg,
            tx,
            shared: Arc::new(DoorShared {
                state: AtomicU8::new(DoorState::Unknown as u8),
                listener: ListenerSlot::new(),
                events: rx,
            }),
        }
    }

    pub fn handle(&self) -> DoorHandle {
        DoorHandle {
            shared: self.shared.clone(),
        }
    }

    /// One poll period. A read error leaves debounce progress untouched.
    pub fn tick(&mut self) -> Option<DoorEvent> {
        match self.sensor.is_present() {
            Ok(present) => self.observe(present),
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::warn!(error = %err, "presence read failed");
                None
            }
        }
    }

    /// Feed one presence reading through the debouncer.
    pub fn observe(&mut self, present: bool) -> Option<DoorEvent> {
        let committed = self.debouncer.observe(present)?;
        let state = DoorState::from_presence(committed);
        self.shared.state.store(state as u8, Ordering::Release);
        let event = DoorEvent {
            state,
            timestamp_ms: self.clock.ms_since(self.epoch),
        };
        tracing::info!(state = %state, "door state changed");

        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(xch::TrySendError::Full(_)) => {
                let err = CoreError::ResourceExhausted("door event queue");
                tracing::warn!(error = %err, "door event dropped: queue full");
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                tracing::trace!("door event queue has no receiver");
            }
        }
        self.shared.listener.dispatch(|l| l.on_door(&event));
        Some(event)
    }
}

impl<P, C> DoorStateMachine<P, C>
where
    P: PresenceSensor + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn spawn(mut self) -> std::io::Result<TaskHandle> {
        let period = util::period(self.cfg.period_ms);
        let clock = self.clock.clone();
        spawn_periodic("door-monitor", period, clock, move || {
            let _ = self.tick();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_commit_needs_full_run() {
        let mut d = Debouncer::new(3);
        assert_eq!(d.observe(true), None);
        assert_eq!(
            d.phase(),
            DebouncePhase::Pending {
                candidate: true,
                count: 1
            }
        );
        assert_eq!(d.observe(true), None);
        assert_eq!(d.observe(true), Some(true));
        assert_eq!(d.committed(), Some(true));
        assert_eq!(d.phase(), DebouncePhase::Stable);
    }

    #[test]
    fn matching_reading_cancels_pending_change() {
        let mut d = Debouncer::new(3);
        for _ in 0..3 {
            d.observe(false);
        }
        d.observe(true);
        d.observe(true);
        assert_eq!(d.observe(false), None);
        assert_eq!(d.phase(), DebouncePhase::Stable);
        assert_eq!(d.committed(), Some(false));
    }

    #[test]
    fn debounce_of_one_commits_immediately() {
        let mut d = Debouncer::new(1);
        assert_eq!(d.observe(false), Some(false));
        assert_eq!(d.observe(true), Some(true));
    }

    #[test]
    fn presence_maps_to_closed() {
        assert_eq!(DoorState::from_presence(true), DoorState::Closed);
        assert_eq!(DoorState::from_presence(false), DoorState::Open);
    }
}
