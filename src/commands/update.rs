//! `update`, `rehash`, `subdir` (§3 "Hash DB" lifecycle, §4.1).

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::db::{self, DbKind};
use crate::filter::Filter;
use crate::pipeline;
use crate::progress;
use crate::tree;

/// `update <dir>`: hash every new or stale file and commit (testable property 3).
pub fn update(dir: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    let (t, _db) = super::open_online_tree(dir, cfg, cancel)?;
    log::info!("{}: {} files tracked", dir.display(), t.entries.len());
    Ok(())
}

/// `rehash <dir>`: like `update`, but ignores cached hashes entirely (forces every file
/// through the pipeline regardless of I2 freshness).
pub fn rehash(dir: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    run_forced(dir, cfg, cancel, |_rel| true)
}

/// `subdir <dir> <subdir>`: rehash only files under `dir/subdir`; the rest of the database is
/// left exactly as-is (not even refreshed from cache), matching "restrict to a subdirectory".
pub fn subdir(dir: &Path, subdir: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    let subdir = subdir.to_path_buf();
    run_forced(dir, cfg, cancel, move |rel: &Path| rel.starts_with(&subdir))
}

fn run_forced(
    dir: &Path,
    cfg: &Config,
    cancel: &Arc<AtomicBool>,
    force: impl Fn(&Path) -> bool,
) -> Result<()> {
    let filter = Filter::from_specs(&cfg.filter_specs);
    let db_path = config::db_path_for(cfg, dir);
    let mut db = db::open(&db_path, &cfg.hasher, DbKind::Online)
        .with_context(|| format!("open database for {}", dir.display()))?;

    let mut t = tree::build_online_tree(dir, &db, &filter)?;
    for entry in &mut t.entries {
        if force(entry.min_path()) {
            entry.hash = None;
        }
    }

    let pb = progress::create_counter("hashing");
    let stats = pipeline::fill_hashes(
        dir,
        &mut t.entries,
        &cfg.hasher,
        &mut db,
        cfg.max_size,
        cfg.workers,
        Arc::clone(cancel),
        progress::batched_callback(pb, 64),
    )?;
    if stats.cancelled {
        return Err(crate::error::HlsyncError::OperationCancelled.into());
    }
    log::info!(
        "{}: rehashed {}, skipped {} unreadable",
        dir.display(),
        stats.hashed,
        stats.skipped_unreadable
    );
    Ok(())
}
