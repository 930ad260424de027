//! Built-in non-cryptographic hashers, grounded in the teacher's `engine::hashing::hash_file`
//! (mmap above a threshold, chunked reads below) but over xxhash instead of blake3: the spec
//! requires a fast 32- or 64-bit hash, not a cryptographic one (§1, §4.1).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;
use xxhash_rust::xxh3::Xxh3;
use xxhash_rust::xxh32::Xxh32;

use crate::error::HlsyncError;
use crate::types::Hash;

/// Above this size, memory-map the file instead of reading it in chunks.
const HASH_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;
/// Chunk size for reading files below the mmap threshold.
const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;

fn unreadable(path: &Path, e: impl std::fmt::Display) -> HlsyncError {
    HlsyncError::FileUnreadable {
        path: path.to_path_buf(),
        cause: e.to_string(),
    }
}

fn open_and_measure(path: &Path) -> Result<(File, u64), HlsyncError> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| unreadable(path, e))?
        .len();
    Ok((file, size))
}

/// Stream `file` through `update` in fixed-size chunks (used below the mmap threshold).
fn stream_chunks<F: FnMut(&[u8])>(file: File, path: &Path, mut update: F) -> Result<(), HlsyncError> {
    let mut reader = std::io::BufReader::with_capacity(HASH_READ_CHUNK_SIZE, file);
    let mut buffer = vec![0u8; HASH_READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer).map_err(|e| unreadable(path, e))?;
        if n == 0 {
            break;
        }
        update(&buffer[..n]);
    }
    Ok(())
}

pub fn hash_file_fast32(path: &Path) -> Result<Hash, HlsyncError> {
    let (file, size) = open_and_measure(path)?;
    let mut hasher = Xxh32::new(0);
    if size > HASH_MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| unreadable(path, e))?;
        hasher.update(&mmap);
    } else {
        stream_chunks(file, path, |chunk| hasher.update(chunk))?;
    }
    Ok(Hash(hasher.digest() as u64))
}

pub fn hash_file_fast64(path: &Path) -> Result<Hash, HlsyncError> {
    let (file, size) = open_and_measure(path)?;
    let mut hasher = Xxh3::new();
    if size > HASH_MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| unreadable(path, e))?;
        hasher.update(&mmap);
    } else {
        stream_chunks(file, path, |chunk| hasher.update(chunk))?;
    }
    Ok(Hash(hasher.digest()))
}
