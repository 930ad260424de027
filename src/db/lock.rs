//! Cooperative whole-file advisory lock on the database file (§5 "Reentrancy", §9 open question).
//!
//! Acquired at open, released (implicitly, by closing the fd) at drop. Grounded in the
//! teacher's Unix-only `libc` usage elsewhere in the codebase (`running_as_root`,
//! `fd_limit::max_open_fds`) — same pattern, different syscall.

use std::fs::File;
use std::path::Path;

use crate::error::HlsyncError;

pub struct LockGuard {
    // Kept alive so the OS releases the lock when the fd closes; never read.
    _file: File,
}

#[cfg(unix)]
pub fn acquire(path: &Path) -> Result<LockGuard, HlsyncError> {
    use std::os::unix::io::AsRawFd;

    let file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| HlsyncError::DbOpenFailed {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        return Err(HlsyncError::DbOpenFailed {
            path: path.to_path_buf(),
            cause: "database is locked by another process".to_string(),
        });
    }

    Ok(LockGuard { _file: file })
}

#[cfg(not(unix))]
pub fn acquire(path: &Path) -> Result<LockGuard, HlsyncError> {
    // No portable advisory lock outside Unix; rely on SQLite's own file locking for
    // cross-process exclusion instead. Reentrancy within one process is still the
    // caller's responsibility (§5).
    let file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| HlsyncError::DbOpenFailed {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
    Ok(LockGuard { _file: file })
}
