//! Typed error kinds for the spec's closed failure contract (§7).
//!
//! These sit at component boundaries (DB open, hasher selection, plan execution).
//! Command orchestration above them uses `anyhow::Result` and adds `.context(...)`.

use std::path::PathBuf;

use thiserror::Error;

use crate::plan::Operation;

#[derive(Debug, Error)]
pub enum HlsyncError {
    #[error("failed to open database at {path}: {cause}")]
    DbOpenFailed { path: PathBuf, cause: String },

    #[error("database schema mismatch at {path}: expected version {expected}, found {found}")]
    DbSchemaMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error(
        "hash-kind mismatch at {path}: database was built with {db_hasher}, command requested {requested}"
    )]
    HashKindMismatch {
        path: PathBuf,
        db_hasher: String,
        requested: String,
    },

    #[error("database at {path} is corrupt: {cause}")]
    DbCorrupt { path: PathBuf, cause: String },

    #[error("file unreadable: {path}: {cause}")]
    FileUnreadable { path: PathBuf, cause: String },

    #[error("directory inaccessible: {path}: {cause}")]
    DirInaccessible { path: PathBuf, cause: String },

    #[error("external hasher failed to execute: {cause}")]
    HasherExecFailed { cause: String },

    #[error("external hasher produced unparseable output: {output:?}")]
    HasherBadOutput { output: String },

    #[error("target path {path} conflicts with an existing entry of a different type")]
    TargetPathTypeConflict { path: PathBuf },

    #[error("rename failed: {from} -> {to}: {cause}")]
    TargetRenameFailed {
        from: PathBuf,
        to: PathBuf,
        cause: String,
    },

    #[error("link failed: {from} -> {to}: {cause}")]
    TargetLinkFailed {
        from: PathBuf,
        to: PathBuf,
        cause: String,
    },

    #[error("unlink failed: {path}: {cause}")]
    TargetUnlinkFailed { path: PathBuf, cause: String },

    #[error("plan execution failed after {n} of {total} operations: {cause}", n = completed.len())]
    PartialPlanFailure {
        completed: Vec<Operation>,
        remaining: Vec<Operation>,
        total: usize,
        cause: String,
    },

    #[error("operation cancelled by user")]
    OperationCancelled,
}
