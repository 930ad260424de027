//! File descriptor limit detection, used to cap pipeline worker count so a wide tree walk
//! never hits EMFILE. Carried verbatim from the teacher's `utils::fd_limit` (§10.5).

/// Estimated file descriptors used per walk/hashing worker (dir handles, open files, mmaps).
pub const FDS_PER_WORKER: usize = 10;

/// Fraction of the process FD limit to use, leaving headroom for the DB connection and stdio.
const FD_LIMIT_FRACTION: f64 = 0.8;

#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Suggested worker cap so the process stays under ~80% of its FD limit. `None` when no
/// limit is available (caller falls back to its own default).
pub fn max_workers_by_fd_limit() -> Option<usize> {
    let limit = max_open_fds()?;
    let usable = (limit as f64 * FD_LIMIT_FRACTION) as usize;
    if usable < FDS_PER_WORKER {
        return Some(1);
    }
    Some(usable / FDS_PER_WORKER)
}
