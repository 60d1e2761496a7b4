//! Cancellable one-shot timer.
//!
//! Each `start` spawns a short-lived thread that waits on a cancel channel
//! with a timeout. Cancelling drops the sender, which wakes the waiter
//! immediately; the callback only runs when the full delay elapses.
use crossbeam_channel as xch;
use std::time::Duration;

pub struct OneShotTimer {
    name: &'static str,
    cancel: Option<xch::Sender<()>>,
}

impl OneShotTimer {
    pub const fn new(name: &'static str) -> Self {
        Self { name, cancel: None }
    }

    /// Arm the timer, replacing any pending expiry.
    pub fn start<F>(&mut self, delay: Duration, on_expire: F) -> std::io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let (tx, rx) = xch::bounded::<()>(0);
        let name = self.name;
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || match rx.recv_timeout(delay) {
                Err(xch::RecvTimeoutError::Timeout) => {
                    tracing::trace!(timer = name, "timer expired");
                    on_expire();
                }
                _ => tracing::trace!(timer = name, "timer cancelled"),
            })?;
        self.cancel = Some(tx);
        Ok(())
    }

    /// Cancel a pending expiry. Does not wait for the timer thread; a callback
    /// already running completes on its own.
    pub fn cancel(&mut self) {
        self.cancel = None;
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn fires_after_delay() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        let mut t = OneShotTimer::new("t-fire");
        t.start(Duration::from_millis(20), move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .expect("spawn");
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_prevents_expiry() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        let mut t = OneShotTimer::new("t-cancel");
        t.start(Duration::from_millis(50), move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
        .expect("spawn");
        t.cancel();
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn restart_replaces_pending_expiry() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut t = OneShotTimer::new("t-restart");
        for _ in 0..3 {
            let h = hits.clone();
            t.start(Duration::from_millis(40), move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .expect("spawn");
        }
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
