//! Hashing pipeline (component D, §4.1, §5): a bounded work queue feeding a fixed worker
//! pool, with a single foreman thread committing results to the DB as they arrive.
//!
//! Grounded in the teacher's `pipeline::metadata` (spawn_metadata_workers: a pool of threads
//! draining a `crossbeam_channel::Receiver`) and `engine::tools::setup_ctrlc_handler` /
//! `check_for_cancel` (cooperative cancellation via a shared `AtomicBool`), generalized from
//! "compute metadata" to "compute a content hash and upsert it".

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Sender};

use crate::db::Db;
use crate::error::HlsyncError;
use crate::hash::HasherKind;
use crate::types::{FileEntry, FileId};

/// Bound on in-flight hashing jobs: caps memory pressure (§4.1 "cap on total in-flight
/// bytes") by simply bounding job *count* per worker rather than bytes, which is sufficient
/// since workers process one file end-to-end before taking the next.
const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// Batch size for committing freshly computed hashes to the DB (single writer, §5).
const COMMIT_BATCH_SIZE: usize = 500;

pub struct PipelineStats {
    pub hashed: usize,
    pub skipped_unreadable: usize,
    pub cancelled: bool,
}

struct Job {
    index: usize,
    file_id: FileId,
    abs_path: PathBuf,
    size: u64,
    mtime: i64,
}

enum JobResult {
    Hashed {
        index: usize,
        file_id: FileId,
        size: u64,
        mtime: i64,
        hash: crate::types::Hash,
    },
    Unreadable {
        path: PathBuf,
    },
}

/// Fill in `hash: None` entries in `entries` (missing or stale per I2) via a bounded worker
/// pool, then commit all successful hashes to `db` in batches. `entries` missing from the DB
/// or with a stale cached value are the ones with `hash.is_none()` on entry to this function
/// (tree construction already applied I2 via `attach_cached_hashes`).
///
/// Files whose size exceeds `max_size` are left unhashed (§4.1 "optional maximum-size cap");
/// `cancel` is checked between files (§4.1 "workers check a cooperative stop flag between
/// files, not mid-file").
pub fn fill_hashes(
    root: &Path,
    entries: &mut [FileEntry],
    hasher: &HasherKind,
    db: &mut Db,
    max_size: Option<u64>,
    workers: usize,
    cancel: Arc<AtomicBool>,
    mut on_progress: impl FnMut(usize),
) -> Result<PipelineStats, HlsyncError> {
    let workers = workers.max(1);
    let targets: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.hash.is_none() && max_size.is_none_or(|cap| e.size <= cap))
        .map(|(i, _)| i)
        .collect();

    if targets.is_empty() {
        return Ok(PipelineStats {
            hashed: 0,
            skipped_unreadable: 0,
            cancelled: false,
        });
    }

    let (job_tx, job_rx) = bounded::<Job>(workers * QUEUE_DEPTH_PER_WORKER);
    let (result_tx, result_rx) = bounded::<JobResult>(workers * QUEUE_DEPTH_PER_WORKER);

    let worker_handles: Vec<_> = (0..workers)
        .map(|_| {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let hasher = hasher.clone();
            let cancel = Arc::clone(&cancel);
            thread::spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let outcome = match hasher.hash_file(&job.abs_path) {
                        Ok(hash) => JobResult::Hashed {
                            index: job.index,
                            file_id: job.file_id,
                            size: job.size,
                            mtime: job.mtime,
                            hash,
                        },
                        Err(e) => {
                            log::warn!("{}: {e}", job.abs_path.display());
                            JobResult::Unreadable { path: job.abs_path }
                        }
                    };
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(result_tx);

    let foreman = thread::spawn({
        let job_tx: Sender<Job> = job_tx.clone();
        let root = root.to_path_buf();
        let jobs: Vec<Job> = targets
            .iter()
            .map(|&i| {
                let e = &entries[i];
                Job {
                    index: i,
                    file_id: e.file_id,
                    abs_path: root.join(e.min_path()),
                    size: e.size,
                    mtime: e.mtime,
                }
            })
            .collect();
        let cancel = Arc::clone(&cancel);
        move || {
            for job in jobs {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        }
    });
    drop(job_tx);

    let mut hashed = 0usize;
    let mut skipped_unreadable = 0usize;
    let mut pending_batch: Vec<FileEntry> = Vec::with_capacity(COMMIT_BATCH_SIZE);

    while let Ok(result) = result_rx.recv() {
        match result {
            JobResult::Hashed {
                index,
                file_id,
                size,
                mtime,
                hash,
            } => {
                entries[index].hash = Some(hash);
                pending_batch.push(FileEntry {
                    file_id,
                    size,
                    mtime,
                    hash: Some(hash),
                    paths: Vec::new(),
                });
                hashed += 1;
                on_progress(1);
                if pending_batch.len() >= COMMIT_BATCH_SIZE {
                    crate::db::upsert_entries(&mut db.conn, &pending_batch)?;
                    pending_batch.clear();
                }
            }
            JobResult::Unreadable { .. } => {
                skipped_unreadable += 1;
            }
        }
    }

    if !pending_batch.is_empty() {
        crate::db::upsert_entries(&mut db.conn, &pending_batch)?;
    }

    let _ = foreman.join();
    for h in worker_handles {
        let _ = h.join();
    }

    Ok(PipelineStats {
        hashed,
        skipped_unreadable,
        cancelled: cancel.load(Ordering::Relaxed),
    })
}
