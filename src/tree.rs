//! Tree view (component C, §3 "Tree view", §9 "Polymorphism over tree kinds"): a uniform
//! read-model over either a live directory (online, backed by a companion hash DB) or a
//! standalone hash DB that also carries the directory structure (offline). A tagged enum
//! suffices per §9 — no trait object is needed since both variants expose the same slice of
//! file entries and directory paths once built.
//!
//! Grounded in the teacher's `pipeline::walk` (jwalk/walkdir dual iterator) and
//! `pipeline::metadata` (path -> entry), generalized from "one path per entry" to "one
//! file-id per entry, possibly several paths" (I1).

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use jwalk::WalkDir;

use crate::db::{self, Db, StoredMeta};
use crate::error::HlsyncError;
use crate::fileid::file_id_of;
use crate::filter::Filter;
use crate::types::{FileEntry, FileId, Mtime};

/// A tree view ready for matching/set-engine use: file entries (I1-partitioned by file-id)
/// plus the set of directory paths known for this tree.
#[derive(Clone, Debug)]
pub struct Tree {
    pub root: Option<PathBuf>,
    pub entries: Vec<FileEntry>,
    pub directories: BTreeSet<PathBuf>,
}

impl Tree {
    pub fn by_id(&self) -> HashMap<FileId, &FileEntry> {
        self.entries.iter().map(|e| (e.file_id, e)).collect()
    }

    /// True iff this tree has a live directory backing it (can be a sync target).
    pub fn is_online(&self) -> bool {
        self.root.is_some()
    }
}

fn to_relative(path: &Path, root: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(|p| p.to_path_buf())
}

fn mtime_of(meta: &std::fs::Metadata) -> Mtime {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Walk `root` (component C online variant), grouping paths into `FileEntry`s by file-id
/// (I1). Applies the include/exclude predicate (H) and skips the reserved DB name (I4).
/// Hashes are left `None`; callers attach cached hashes via [`attach_cached_hashes`] and fill
/// the rest with the hashing pipeline (D).
pub fn walk_online(
    root: &Path,
    filter: &Filter,
    db_prefix: &str,
) -> Result<(Vec<FileEntry>, BTreeSet<PathBuf>), HlsyncError> {
    let mut by_id: HashMap<FileId, FileEntry> = HashMap::new();
    let mut directories: BTreeSet<PathBuf> = BTreeSet::new();

    for entry in WalkDir::new(root).skip_hidden(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("directory walk error: {e}");
                continue;
            }
        };
        let abs_path = entry.path();
        if abs_path == root {
            continue;
        }
        let Some(rel) = to_relative(&abs_path, root) else {
            continue;
        };
        let is_dir = entry.file_type().is_dir();
        let seg_owned: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let seg_refs: Vec<&str> = seg_owned.iter().map(|s| s.as_str()).collect();
        if !filter.include(&seg_refs, is_dir) {
            continue;
        }

        if is_dir {
            directories.insert(rel);
            continue;
        }
        if !entry.file_type().is_file() {
            continue; // symlinks, sockets, etc. are not regular files (§3 scope).
        }
        if db::is_reserved_db_name(&abs_path, db_prefix) {
            continue; // I4: the DB file itself is never a file entry.
        }

        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("{}: {e}", abs_path.display());
                continue;
            }
        };
        let file_id = file_id_of(&meta, &abs_path);
        let size = meta.len();
        let mtime = mtime_of(&meta);

        by_id
            .entry(file_id)
            .and_modify(|fe| fe.paths.push(rel.clone()))
            .or_insert_with(|| FileEntry {
                file_id,
                size,
                mtime,
                hash: None,
                paths: vec![rel.clone()],
            });
    }

    Ok((by_id.into_values().collect(), directories))
}

/// Apply I2 freshness: a cached hash is valid only if the entry's current `(size, mtime)`
/// matches what was stored alongside it. Mismatch invalidates the entry (hash stays `None`).
pub fn attach_cached_hashes(entries: &mut [FileEntry], stored: &HashMap<FileId, StoredMeta>) {
    for entry in entries.iter_mut() {
        if let Some((size, mtime, hash)) = stored.get(&entry.file_id)
            && *size == entry.size
            && *mtime == entry.mtime
        {
            entry.hash = *hash;
        }
    }
}

/// Build the online tree view for `root`: walk the filesystem, then overlay cached hashes
/// from `db`. File-ids missing or stale still have `hash: None`; run the hashing pipeline (D)
/// afterward to fill them in before matching.
pub fn build_online_tree(root: &Path, db: &Db, filter: &Filter) -> Result<Tree, HlsyncError> {
    let (mut entries, directories) = walk_online(root, filter, db::DEFAULT_PREFIX)?;
    let stored = db::load_entries(&db.conn)?;
    attach_cached_hashes(&mut entries, &stored);
    Ok(Tree {
        root: Some(root.to_path_buf()),
        entries,
        directories,
    })
}

/// Build the offline tree view from a standalone DB (§3 "Offline tree"): entries and
/// directory paths both come from the DB, never a live filesystem.
pub fn build_offline_tree(db: &Db) -> Result<Tree, HlsyncError> {
    let stored = db::load_entries(&db.conn)?;
    let paths = db::load_paths(&db.conn)?;

    let mut entries = Vec::with_capacity(stored.len());
    let mut directories = BTreeSet::new();
    for (file_id, (size, mtime, hash)) in stored {
        let Some(file_paths) = paths.get(&file_id) else {
            continue;
        };
        for p in file_paths {
            let mut cur = p.parent();
            while let Some(dir) = cur {
                if dir.as_os_str().is_empty() {
                    break;
                }
                if !directories.insert(dir.to_path_buf()) {
                    break;
                }
                cur = dir.parent();
            }
        }
        entries.push(FileEntry {
            file_id,
            size,
            mtime,
            hash,
            paths: file_paths.clone(),
        });
    }

    Ok(Tree {
        root: None,
        entries,
        directories,
    })
}

/// Snapshot the file-ids currently reachable under `root` (fresh walk, no DB), for `cleandb`
/// pruning and for feeding [`crate::db::prune_entries`] (§3 "Hash DB" lifecycle).
pub fn live_file_ids(root: &Path, filter: &Filter) -> Result<BTreeSet<FileId>, HlsyncError> {
    let (entries, _) = walk_online(root, filter, db::DEFAULT_PREFIX)?;
    Ok(entries.into_iter().map(|e| e.file_id).collect())
}

/// Collect `(file_id, path)` pairs for every hard link in `tree` (used by `mkoffline` to
/// populate the offline path table, §3).
pub fn path_table(tree: &Tree) -> Vec<(FileId, PathBuf)> {
    tree.entries
        .iter()
        .flat_map(|e| e.paths.iter().map(move |p| (e.file_id, p.clone())))
        .collect()
}
