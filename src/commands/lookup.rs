//! `lookup <dir> <path>`: print the cached `(size, mtime, hash)` for one path, if present.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{self, Config};
use crate::db::{self, DbKind};
use crate::fileid::file_id_of;

pub fn run(dir: &Path, path: &Path, cfg: &Config) -> Result<()> {
    let db_path = config::db_path_for(cfg, dir);
    let db = db::open(&db_path, &cfg.hasher, DbKind::Online)
        .with_context(|| format!("open database for {}", dir.display()))?;

    let abs = dir.join(path);
    let meta = std::fs::symlink_metadata(&abs).with_context(|| format!("stat {}", abs.display()))?;
    let file_id = file_id_of(&meta, &abs);

    let stored = db::load_entries(&db.conn)?;
    match stored.get(&file_id) {
        Some((size, mtime, hash)) => {
            log::info!(
                "{}: size={size} mtime={mtime} hash={}",
                path.display(),
                hash.map(|h| h.0.to_string()).unwrap_or_else(|| "none".to_string())
            );
        }
        None => log::info!("{}: not in database", path.display()),
    }
    Ok(())
}
