//! `check <dir>` (scenario 5, "bitrot"): rehash every file the database currently trusts via
//! I2 and compare against the stored hash, without writing anything back. `update` trusts a
//! cached hash whenever size and mtime still match (I2); that is exactly the case `check`
//! exists to double-check, since I2 cannot detect content that changed silently underneath an
//! unchanged size and mtime.
//!
//! Grounded in the teacher's `check_dir` (fresh walk + hash, diffed against a loaded index)
//! and `print_diff` (colorized added/removed/modified summary), generalized from "did
//! metadata change" to "did content change despite unchanged metadata".

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::db::{self, DbKind};
use crate::filter::Filter;
use crate::logging::Colors;
use crate::tree;

pub fn run(dir: &Path, cfg: &Config) -> Result<()> {
    let filter = Filter::from_specs(&cfg.filter_specs);
    let db_path = config::db_path_for(cfg, dir);
    let db = db::open(&db_path, &cfg.hasher, DbKind::Online)
        .with_context(|| format!("open database for {}", dir.display()))?;

    let t = tree::build_online_tree(dir, &db, &filter).with_context(|| format!("walk {}", dir.display()))?;
    let stored = db::load_entries(&db.conn)?;

    let mut corrupt = Vec::new();
    let mut stale = Vec::new();
    let mut unindexed = Vec::new();
    let mut unreadable = Vec::new();

    for entry in &t.entries {
        match entry.hash {
            Some(trusted) => {
                let abs = dir.join(entry.min_path());
                match cfg.hasher.hash_file(&abs) {
                    Ok(fresh) if fresh == trusted => {}
                    Ok(_) => corrupt.push(entry.min_path().clone()),
                    Err(e) => {
                        log::warn!("{}: {e}", abs.display());
                        unreadable.push(entry.min_path().clone());
                    }
                }
            }
            None => {
                if stored.contains_key(&entry.file_id) {
                    stale.push(entry.min_path().clone());
                } else {
                    unindexed.push(entry.min_path().clone());
                }
            }
        }
    }

    for path in &corrupt {
        println!("{}", Colors::colorize(Colors::REMOVED, &format!("corrupt: {}", path.display())));
    }
    for path in &stale {
        println!("{}", Colors::colorize(Colors::MODIFIED, &format!("stale (run update): {}", path.display())));
    }
    for path in &unindexed {
        println!("{}", Colors::colorize(Colors::ADDED, &format!("unindexed: {}", path.display())));
    }

    log::info!(
        "{}: {} corrupt, {} stale, {} unindexed, {} unreadable, {} checked clean",
        dir.display(),
        corrupt.len(),
        stale.len(),
        unindexed.len(),
        unreadable.len(),
        t.entries.len() - corrupt.len() - stale.len() - unindexed.len() - unreadable.len()
    );

    if !corrupt.is_empty() {
        anyhow::bail!("{}: {} file(s) failed integrity check", dir.display(), corrupt.len());
    }
    Ok(())
}
