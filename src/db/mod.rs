//! Hash database (component B, §3, §6): schema, connection/locking, entry upsert/prune/compact,
//! and the offline path table.

mod connection;
mod entries;
mod lock;
mod offline;
mod schema;

pub use connection::{Db, StoredMeta, load_entries, mark_offline, open};
pub use entries::{compact, prune_entries, upsert_entries};
pub use offline::{is_reserved_db_name, load_paths, write_paths};
pub use schema::DbKind;

use rand::Rng;
use std::path::{Path, PathBuf};

/// Default database-name prefix (§6: "where `<prefix>` defaults to a fixed token").
pub const DEFAULT_PREFIX: &str = "hlsync";

/// Build a fresh randomized database path at `root` (§6: "Numeric suffix randomised at
/// creation to reduce collision when sync tools copy databases by accident").
pub fn new_db_path(root: &Path, prefix: &str) -> PathBuf {
    let suffix: u32 = rand::thread_rng().r#gen();
    root.join(format!("{prefix}-{suffix}.db"))
}

/// Find an existing database at `root` matching `<prefix>-[0-9]+\.db`, if any.
pub fn find_db_path(root: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if is_reserved_db_name(&path, prefix) {
            return Some(path);
        }
    }
    None
}

/// Resolve the database path to use for `root`: explicit override, else an existing
/// on-disk database, else a freshly randomized one.
pub fn resolve_db_path(root: &Path, explicit: Option<&Path>, prefix: &str) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    find_db_path(root, prefix).unwrap_or_else(|| new_db_path(root, prefix))
}
