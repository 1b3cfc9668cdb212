//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall).
//!
//! RC decay times are measured by polling a microsecond clock. On a Linux
//! host a page fault or a preemption in the middle of the poll loop shows up
//! directly as a longer decay time, so timing-sensitive users should lock
//! memory and run the sampling thread under SCHED_FIFO.

use libc::{
    MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, mlockall, sched_get_priority_max, sched_get_priority_min,
    sched_param, sched_setscheduler,
};
use tracing::{info, warn};

use crate::error::{HwError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemLock {
    #[default]
    None,
    Current,
    All,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RtOptions {
    /// SCHED_FIFO priority; clamped to the system range. `None` leaves the
    /// scheduling policy untouched.
    pub priority: Option<i32>,
    pub lock: MemLock,
}

/// Apply memory locking and FIFO scheduling to the calling thread's process.
pub fn enter_realtime(opts: RtOptions) -> Result<()> {
    apply_mem_lock(opts.lock)?;
    if let Some(prio) = opts.priority {
        apply_fifo_priority(prio)?;
    }
    Ok(())
}

fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
}

fn lock(flags: libc::c_int) -> std::io::Result<()> {
    // SAFETY: mlockall only takes flags and has no memory-safety preconditions.
    let rc = unsafe { mlockall(flags) };
    if rc != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn apply_mem_lock(mode: MemLock) -> Result<()> {
    let result = match mode {
        MemLock::None => return Ok(()),
        MemLock::Current => lock(MCL_CURRENT),
        MemLock::All => lock(MCL_CURRENT | MCL_FUTURE),
    };
    let Err(err) = result else {
        info!(?mode, "memory locked");
        return Ok(());
    };

    // All failed for lack of permission or memory: settle for Current.
    if mode == MemLock::All && is_retryable_memlock_error(&err) {
        match lock(MCL_CURRENT) {
            Ok(()) => {
                warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
                return Ok(());
            }
            Err(e2) => {
                return Err(HwError::Realtime(format!(
                    "mlockall(current|future) failed: {err}; fallback mlockall(current) also failed: {e2}; \
                     hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'"
                )));
            }
        }
    }
    Err(HwError::Realtime(format!("mlockall failed: {err}")))
}

fn apply_fifo_priority(prio: i32) -> Result<()> {
    // SAFETY: plain queries of the scheduler limits.
    let (min, max) = unsafe {
        (
            sched_get_priority_min(SCHED_FIFO),
            sched_get_priority_max(SCHED_FIFO),
        )
    };
    if min < 0 || max < 0 {
        return Err(HwError::Realtime(
            "SCHED_FIFO priority range unavailable".to_string(),
        ));
    }
    let clamped = prio.clamp(min, max);
    let param = sched_param {
        sched_priority: clamped,
    };
    // SAFETY: pid 0 is the calling process and `param` outlives the call.
    let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        return Err(HwError::Realtime(format!(
            "sched_setscheduler(SCHED_FIFO, {clamped}) failed: {err}; needs CAP_SYS_NICE or root"
        )));
    }
    info!(priority = clamped, "running under SCHED_FIFO");
    Ok(())
}
