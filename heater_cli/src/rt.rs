//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall; macOS mlockall).
//!
//! Failures are logged and the loop runs without RT guarantees.

use crate::cli::RtLock;

#[cfg(unix)]
fn mem_lock(lock: RtLock) -> std::io::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall takes flags only and has no memory preconditions.
    let rc = unsafe { mlockall(flags) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(target_os = "linux")]
fn memlock_limit_hint() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success; we only read it then.
    let r = unsafe {
        if libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) != 0 {
            return None;
        }
        rlim.assume_init()
    };
    if r.rlim_cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".to_string())
    } else {
        Some(format!("memlock limit: {} KiB", r.rlim_cur / 1024))
    }
}

#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: plain queries of the scheduler range.
    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    // Leave headroom above the loop for kernel threads.
    let wanted = prio.unwrap_or(max / 2).clamp(min, max);
    let param = sched_param {
        sched_priority: wanted,
    };
    // SAFETY: `param` is a valid sched_param for the lifetime of the call.
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!(
            "sched_setscheduler(SCHED_FIFO, {wanted}) failed: {err}; needs CAP_SYS_NICE or root"
        );
    }
    Ok(wanted)
}

/// Apply RT settings once per process.
#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "rt memory lock applied"),
            Err(e) => {
                let hint = memlock_limit_hint().unwrap_or_default();
                tracing::warn!(?lock, error = %e, hint, "mlockall failed");
            }
        }
        match fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "SCHED_FIFO enabled"),
            Err(e) => tracing::warn!(error = %e, "realtime priority not applied"),
        }
    });
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn setup_rt_once(_prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        if let Err(e) = mem_lock(lock) {
            tracing::warn!(?lock, error = %e, "mlockall failed");
        }
        tracing::warn!("SCHED_FIFO is not available on this OS; only mlockall applied");
    });
}

#[cfg(not(unix))]
pub fn setup_rt_once(_prio: Option<i32>, _lock: RtLock) {
    tracing::warn!("real-time mode is not supported on this OS");
}
