//! `cleandb <dir>` (§3 "Hash DB" lifecycle): drop rows for files no longer on disk, then
//! reclaim space.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::db::{self, DbKind};
use crate::filter::Filter;
use crate::tree;

pub fn run(dir: &Path, cfg: &Config) -> Result<()> {
    let filter = Filter::from_specs(&cfg.filter_specs);
    let db_path = config::db_path_for(cfg, dir);
    let mut db = db::open(&db_path, &cfg.hasher, DbKind::Online)
        .with_context(|| format!("open database for {}", dir.display()))?;

    let live_ids: std::collections::HashSet<_> = tree::live_file_ids(dir, &filter)?.into_iter().collect();
    let removed = db::prune_entries(&mut db.conn, &live_ids)?;
    db::compact(&db.conn)?;
    log::info!("{}: removed {removed} stale entries, compacted", dir.display());
    Ok(())
}
