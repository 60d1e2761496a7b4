//! Periodic background tasks.
//!
//! Each `TaskHandle` owns exactly one thread that runs a tick closure on an
//! absolute-deadline schedule. Dropping the handle signals shutdown and joins
//! the thread, so tasks never outlive the controller that started them.
use crate::util::Pacer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vehicle_traits::clock::Clock;

/// Upper bound on how long a sleeping task takes to notice shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(20);

pub struct TaskHandle {
    name: &'static str,
    shutdown: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

/// Spawn a named thread calling `tick` once per `period`.
///
/// The first tick runs immediately; later ticks are paced against absolute
/// deadlines (see `Pacer`).
pub fn spawn_periodic<C, F>(
    name: &'static str,
    period: Duration,
    clock: C,
    mut tick: F,
) -> std::io::Result<TaskHandle>
where
    C: Clock + Send + 'static,
    F: FnMut() + Send + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let ticks = Arc::new(AtomicU64::new(0));
    let ticks_clone = ticks.clone();

    let join_handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut pacer = Pacer::new(clock.now(), period);
            tracing::debug!(
                task = name,
                period_ms = %pacer.period().as_millis(),
                "task started"
            );
            loop {
                if shutdown_clone.load(Ordering::Acquire) {
                    tracing::debug!(task = name, "task received shutdown signal");
                    break;
                }
                tick();
                ticks_clone.fetch_add(1, Ordering::Relaxed);

                let deadline = pacer.next_deadline(clock.now());
                if !wait_until(&clock, deadline, &shutdown_clone) {
                    break;
                }
            }
            tracing::trace!(task = name, overruns = pacer.overruns(), "task exiting cleanly");
        })?;

    Ok(TaskHandle {
        name,
        shutdown,
        ticks,
        join_handle: Some(join_handle),
    })
}

/// Sleep until `deadline` in short slices; returns false when shutdown was
/// requested before the deadline.
fn wait_until<C: Clock + ?Sized>(clock: &C, deadline: Instant, shutdown: &AtomicBool) -> bool {
    loop {
        if shutdown.load(Ordering::Acquire) {
            return false;
        }
        let now = clock.now();
        if now >= deadline {
            return true;
        }
        clock.sleep_until(deadline.min(now + SHUTDOWN_POLL));
    }
}

impl TaskHandle {
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Completed tick count.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    /// Signal shutdown and wait for the thread. Returns false if it panicked.
    pub fn stop(mut self) -> bool {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> bool {
        self.shutdown.store(true, Ordering::Release);
        match self.join_handle.take() {
            Some(handle) => match handle.join() {
                Ok(()) => {
                    tracing::trace!(task = self.name, "task joined");
                    true
                }
                Err(e) => {
                    tracing::warn!(?e, task = self.name, "task panicked");
                    false
                }
            },
            None => true,
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .field("ticks", &self.ticks())
            .finish_non_exhaustive()
    }
}
