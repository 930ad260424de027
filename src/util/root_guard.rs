//! Root-ownership safety nudge, carried from the teacher's `engine::tools::running_as_root` (§10.5).

#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}
