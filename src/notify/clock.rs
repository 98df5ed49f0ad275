//! Monotonic clock readings for `MONOTONIC_USEC`.
//!
//! The supervisor compares the reported value against its own `CLOCK_MONOTONIC`, so
//! this has to be the raw system clock rather than a process-relative `Instant`.

use std::io;

/// Read `CLOCK_MONOTONIC` in whole microseconds.
pub fn monotonic_usec() -> io::Result<u64> {
    // SAFETY: `timespec` is plain old data and `clock_gettime` only writes into it.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let secs = u64::try_from(ts.tv_sec).map_err(|_| io::Error::other("negative tv_sec"))?;
    let nanos = u64::try_from(ts.tv_nsec).map_err(|_| io::Error::other("negative tv_nsec"))?;
    Ok(secs.saturating_mul(1_000_000).saturating_add(nanos / 1_000))
}
