pub mod fd_limit;
pub mod path_bytes;
pub mod root_guard;

pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit};
pub use root_guard::running_as_root;
