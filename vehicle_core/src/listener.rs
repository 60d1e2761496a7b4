//! Single-subscriber callback slot shared by the event-producing tasks.
//!
//! At most one listener is registered per slot; registering again replaces
//! the previous one. Callbacks run on the producing task's thread.
use parking_lot::Mutex;

struct SlotInner<L: ?Sized> {
    listener: Option<Box<L>>,
    /// Bumped on every set/clear so an in-flight dispatch does not restore a
    /// listener that was replaced or removed meanwhile.
    version: u64,
}

pub struct ListenerSlot<L: ?Sized> {
    inner: Mutex<SlotInner<L>>,
}

impl<L: ?Sized> Default for ListenerSlot<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> ListenerSlot<L> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                listener: None,
                version: 0,
            }),
        }
    }

    /// Register `listener`, returning true when it replaced an existing one.
    pub fn set(&self, listener: Box<L>) -> bool {
        let mut g = self.inner.lock();
        g.version = g.version.wrapping_add(1);
        g.listener.replace(listener).is_some()
    }

    pub fn clear(&self) -> bool {
        let mut g = self.inner.lock();
        g.version = g.version.wrapping_add(1);
        g.listener.take().is_some()
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().listener.is_some()
    }

    /// Invoke the registered listener, if any.
    ///
    /// The listener is taken out of the slot for the duration of the call, so
    /// it may safely call back into the owning component (including
    /// re-registering).
    pub fn dispatch<F: FnOnce(&mut L)>(&self, f: F) -> bool {
        let (mut listener, version) = {
            let mut g = self.inner.lock();
            match g.listener.take() {
                Some(l) => (l, g.version),
                None => return false,
            }
        };
        f(listener.as_mut());
        let mut g = self.inner.lock();
        if g.version == version && g.listener.is_none() {
            g.listener = Some(listener);
        }
        true
    }
}
