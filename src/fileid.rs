//! Platform-specific file identity: (device, inode) on Unix, (volume, file-index) on Windows.

use std::fs::Metadata;
use std::path::Path;

use crate::types::FileId;

#[cfg(unix)]
pub fn file_id_of(meta: &Metadata, _path: &Path) -> FileId {
    use std::os::unix::fs::MetadataExt;
    FileId::new(meta.dev(), meta.ino())
}

#[cfg(windows)]
pub fn file_id_of(meta: &Metadata, _path: &Path) -> FileId {
    use std::os::windows::fs::MetadataExt;
    // `file_index` alone is unique per volume; fold the volume serial in as the high bits.
    let volume = meta.volume_serial_number().unwrap_or(0) as u64;
    let index = meta.file_index().unwrap_or(0);
    FileId::new(volume, index)
}

/// Fallback for platforms with no portable hard-link identity: derive a synthetic id from
/// the canonical path. Every path gets a distinct id, so hard links are never detected here
/// (I1 still holds trivially: one path per id), which is safe but conservative — the walk
/// never merges two unrelated files, it just fails to recognize real hard links as one file.
#[cfg(not(any(unix, windows)))]
pub fn file_id_of(_meta: &Metadata, path: &Path) -> FileId {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let canon = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = DefaultHasher::new();
    canon.hash(&mut hasher);
    FileId::new(0, hasher.finish())
}
