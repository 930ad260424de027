//! Command handlers (one per CLI verb), wiring the tree/pipeline/matcher/plan/set-engine
//! components together. Grounded in the teacher's `engine::handlers` split: a small
//! `setup_*` helper assembles shared state, then each handler is a short, linear function.

mod check;
mod cleandb;
mod lookup;
mod mkoffline;
mod query;
mod sync;
mod update;

pub use check::run as check;
pub use cleandb::run as cleandb;
pub use lookup::run as lookup;
pub use mkoffline::run as mkoffline;
pub use query::{cmp, fdupes, onall, onfirstonly, onlastonly, search};
pub use sync::{rsync, sync, syncr};
pub use update::{rehash, subdir, update};

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::db::{self, Db, DbKind};
use crate::filter::Filter;
use crate::pipeline;
use crate::progress;
use crate::tree::{self, Tree};

/// Open the online tree at `root`: create or open its database, walk the directory, overlay
/// cached hashes, then run the hashing pipeline to fill in the rest (§3, §4.1). Returns the
/// tree and the open database handle (callers commit further writes, e.g. `mark_offline`).
pub fn open_online_tree(root: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<(Tree, Db)> {
    let filter = Filter::from_specs(&cfg.filter_specs);
    let db_path = config::db_path_for(cfg, root);
    let mut db = db::open(&db_path, &cfg.hasher, DbKind::Online)
        .with_context(|| format!("open database for {}", root.display()))?;

    let mut t = tree::build_online_tree(root, &db, &filter)
        .with_context(|| format!("walk {}", root.display()))?;

    let pb = progress::create_counter("hashing");
    let stats = pipeline::fill_hashes(
        root,
        &mut t.entries,
        &cfg.hasher,
        &mut db,
        cfg.max_size,
        cfg.workers,
        Arc::clone(cancel),
        progress::batched_callback(pb.clone(), 64),
    )?;
    progress::update_progress_bar(&pb, 0); // final refresh; batched callback may have a partial chunk pending.
    log::debug!(
        "{}: hashed {}, skipped {} unreadable{}",
        root.display(),
        stats.hashed,
        stats.skipped_unreadable,
        if stats.cancelled { " (cancelled)" } else { "" }
    );
    if stats.cancelled {
        return Err(crate::error::HlsyncError::OperationCancelled.into());
    }

    Ok((t, db))
}

/// Open either an online directory or an offline database file as a read-only tree view
/// (§3 "Offline tree" is "substitutable for an online tree in read-only contexts").
pub fn open_location_tree(loc: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<Tree> {
    if loc.is_file() {
        let db = db::open(loc, &cfg.hasher, DbKind::Offline).with_context(|| format!("open offline database {}", loc.display()))?;
        tree::build_offline_tree(&db).with_context(|| format!("read offline database {}", loc.display()))
    } else {
        let (t, _db) = open_online_tree(loc, cfg, cancel)?;
        Ok(t)
    }
}
