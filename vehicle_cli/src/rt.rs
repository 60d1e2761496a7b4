//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall, mlockall only elsewhere).
//!
//! Everything here is best effort: a failure is logged and the run continues
//! with normal scheduling. Call before the controller starts so the sampling
//! threads inherit the policy.

use crate::cli::RtLock;
use std::sync::OnceLock;

static RT_ONCE: OnceLock<()> = OnceLock::new();

fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
}

fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    let rc = unsafe { libc::mlockall(flags) };
    if rc != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    let result = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => mlockall(libc::MCL_CURRENT),
        RtLock::All => mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE),
    };
    let Err(err) = result else {
        return Ok(());
    };
    // All failed for lack of privilege or memory: Current may still fit.
    if lock == RtLock::All && is_retryable_memlock_error(&err) && mlockall(libc::MCL_CURRENT).is_ok()
    {
        tracing::warn!(%err, "mlockall(current|future) failed; fell back to current");
        return Ok(());
    }
    let mut msg = format!("mlockall failed: {err}");
    if is_retryable_memlock_error(&err) {
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio,
    };
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!("sched_setscheduler(SCHED_FIFO, {prio}) failed: {err}; hint: needs CAP_SYS_NICE or root");
    }
    Ok(prio)
}

#[cfg(not(target_os = "linux"))]
fn apply_fifo_priority(_prio: Option<i32>) -> eyre::Result<i32> {
    eyre::bail!("SCHED_FIFO is only supported on Linux")
}

/// Apply real-time settings once per process.
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) {
    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "RT: memory lock applied"),
            Err(err) => tracing::warn!("RT: {err}"),
        }
        match apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "RT: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!("RT: {err}"),
        }
    });
}
