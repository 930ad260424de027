//! `mkoffline <dir> <out>` (§3 "Hash DB" lifecycle, testable property 6 "round trip"):
//! snapshot a live directory's hashes and directory structure into a standalone database file
//! that can later substitute for `dir` in any read-only context (a sync source, a query input).

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::{self, DbKind};
use crate::tree;

pub fn run(dir: &Path, out: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    let (t, _dir_db) = super::open_online_tree(dir, cfg, cancel)?;

    let mut out_db = db::open(out, &cfg.hasher, DbKind::Offline)
        .with_context(|| format!("open/create offline database {}", out.display()))?;
    db::upsert_entries(&mut out_db.conn, &t.entries)?;
    db::write_paths(&mut out_db.conn, &tree::path_table(&t))?;
    db::mark_offline(&mut out_db)?;

    log::info!("{}: wrote offline snapshot of {} files to {}", dir.display(), t.entries.len(), out.display());
    Ok(())
}
