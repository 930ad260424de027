//! Core data model: file identity, file entries, content keys.

use std::path::PathBuf;

/// OS-level identity of a file: two paths share a `FileId` iff they are hard links
/// to the same inode. Offline trees synthesize a stable id at snapshot time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u64, pub u64);

impl FileId {
    pub fn new(device: u64, inode: u64) -> Self {
        FileId(device, inode)
    }
}

/// Modification time at integer-second precision.
pub type Mtime = i64;

/// Content hash: either a 32-bit or 64-bit unsigned integer, depending on the hasher.
/// Values are stored widened to `u64` with the bit-width implied by the hasher identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub u64);

/// (size, hash) or (size,) in size-only mode. The unit used to group files by content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKey {
    SizeAndHash(u64, Hash),
    SizeOnly(u64),
}

/// A single file within one tree view: its identity, size/mtime, cached hash (if fresh),
/// and every relative path currently pointing at it (I1: more than one iff hard-linked).
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub file_id: FileId,
    pub size: u64,
    pub mtime: Mtime,
    pub hash: Option<Hash>,
    pub paths: Vec<PathBuf>,
}

impl FileEntry {
    /// Lexicographically smallest path among this file's hard links. Stable tie-breaker
    /// used throughout the match engine and set engine (§4.2, §4.4).
    pub fn min_path(&self) -> &PathBuf {
        self.paths
            .iter()
            .min()
            .expect("FileEntry.paths is non-empty by construction")
    }

    pub fn content_key(&self, size_only: bool) -> ContentKey {
        if size_only {
            ContentKey::SizeOnly(self.size)
        } else {
            ContentKey::SizeAndHash(self.size, self.hash.unwrap_or(Hash(0)))
        }
    }
}

/// Result of comparing two trees at matching relative paths (the `cmp` query, §4.4).
#[derive(Debug, Default, Clone)]
pub struct CmpReport {
    pub identical: Vec<PathBuf>,
    pub different: Vec<PathBuf>,
    pub missing_on_first: Vec<PathBuf>,
    pub missing_on_second: Vec<PathBuf>,
    pub type_mismatch: Vec<PathBuf>,
}

/// Output granularity for set-engine queries (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// One path per file: the lexicographic minimum among its hard links.
    File,
    /// Every path of every matching file, each reported on its own.
    HardLinks,
    /// One entry per file, but listing every path it has.
    AllLinks,
}
