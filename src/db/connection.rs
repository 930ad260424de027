//! Open/create the hash database, enforce the header contract, and expose it with its
//! advisory lock held for the lifetime of the handle (§5, §6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::HlsyncError;
use crate::hash::HasherKind;
use crate::types::{FileId, Hash, Mtime};

use super::lock::{self, LockGuard};
use super::schema::{CURRENT_SCHEMA_VERSION, DbKind, SCHEMA, WAL_PRAGMAS};

/// Row shape stored per file-id: (size, mtime, hash). `hash` is `None` until the pipeline
/// fills it in (§3 "Hash DB").
pub type StoredMeta = (u64, Mtime, Option<Hash>);

pub struct Db {
    pub conn: Connection,
    pub path: PathBuf,
    pub kind: DbKind,
    pub hasher: HasherKind,
    _lock: LockGuard,
}

fn open_conn(path: &Path) -> Result<Connection, HlsyncError> {
    let conn = Connection::open(path).map_err(|e| HlsyncError::DbOpenFailed {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })?;
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(|e| HlsyncError::DbOpenFailed {
            path: path.to_path_buf(),
            cause: format!("enable WAL: {e}"),
        })?;
    conn.execute_batch(WAL_PRAGMAS)
        .map_err(|e| HlsyncError::DbOpenFailed {
            path: path.to_path_buf(),
            cause: format!("set WAL pragmas: {e}"),
        })?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| HlsyncError::DbOpenFailed {
            path: path.to_path_buf(),
            cause: format!("create schema: {e}"),
        })?;
    Ok(conn)
}

fn read_meta(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
        row.get::<_, String>(0)
    })
    .ok()
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Open (creating if absent) the database at `path`. A freshly created database adopts
/// `requested_hasher` and `kind`; an existing one is checked against `requested_hasher`
/// and fails with `HashKindMismatch` on disagreement (§4.1, testable property 7).
pub fn open(
    path: &Path,
    requested_hasher: &HasherKind,
    kind: DbKind,
) -> Result<Db, HlsyncError> {
    let lock_guard = lock::acquire(path)?;
    let conn = open_conn(path)?;

    let schema_version = read_meta(&conn, "schema_version");
    let is_new = schema_version.is_none();

    if is_new {
        write_meta(&conn, "schema_version", &CURRENT_SCHEMA_VERSION.to_string())
            .and_then(|_| write_meta(&conn, "hasher_id", &requested_hasher.identifier()))
            .and_then(|_| write_meta(&conn, "db_kind", kind.as_str()))
            .map_err(|e| HlsyncError::DbOpenFailed {
                path: path.to_path_buf(),
                cause: format!("write header: {e}"),
            })?;
    } else {
        let found: u32 = schema_version
            .as_deref()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| HlsyncError::DbCorrupt {
                path: path.to_path_buf(),
                cause: "schema_version is not an integer".to_string(),
            })?;
        if found != CURRENT_SCHEMA_VERSION {
            return Err(HlsyncError::DbSchemaMismatch {
                path: path.to_path_buf(),
                expected: CURRENT_SCHEMA_VERSION,
                found,
            });
        }
        let stored_id = read_meta(&conn, "hasher_id").ok_or_else(|| HlsyncError::DbCorrupt {
            path: path.to_path_buf(),
            cause: "missing hasher_id".to_string(),
        })?;
        if stored_id != requested_hasher.identifier() {
            return Err(HlsyncError::HashKindMismatch {
                path: path.to_path_buf(),
                db_hasher: stored_id,
                requested: requested_hasher.identifier(),
            });
        }
    }

    let stored_kind = read_meta(&conn, "db_kind")
        .map(|s| DbKind::from_str(&s))
        .unwrap_or(kind);

    Ok(Db {
        conn,
        path: path.to_path_buf(),
        kind: stored_kind,
        hasher: requested_hasher.clone(),
        _lock: lock_guard,
    })
}

/// Mark an online database as offline (`mkoffline`, §3 "Hash DB" lifecycle).
pub fn mark_offline(db: &mut Db) -> Result<(), HlsyncError> {
    write_meta(&db.conn, "db_kind", DbKind::Offline.as_str()).map_err(|e| {
        HlsyncError::DbOpenFailed {
            path: db.path.clone(),
            cause: e.to_string(),
        }
    })?;
    db.kind = DbKind::Offline;
    Ok(())
}

/// Load every cached `(file_id -> (size, mtime, hash))` row (§3 "Hash DB").
pub fn load_entries(conn: &Connection) -> Result<HashMap<FileId, StoredMeta>, HlsyncError> {
    let mut stmt = conn
        .prepare("SELECT device, inode, size, mtime, hash FROM entries")
        .map_err(|e| db_corrupt(conn, e))?;
    let rows = stmt
        .query_map([], |row| {
            let device: i64 = row.get(0)?;
            let inode: i64 = row.get(1)?;
            let size: i64 = row.get(2)?;
            let mtime: i64 = row.get(3)?;
            let hash: Option<i64> = row.get(4)?;
            Ok((
                FileId::new(device as u64, inode as u64),
                (size.max(0) as u64, mtime, hash.map(|h| Hash(h as u64))),
            ))
        })
        .map_err(|e| HlsyncError::DbCorrupt {
            path: PathBuf::new(),
            cause: e.to_string(),
        })?;
    let mut map = HashMap::new();
    for row in rows {
        let (id, meta) = row.map_err(|e| HlsyncError::DbCorrupt {
            path: PathBuf::new(),
            cause: e.to_string(),
        })?;
        map.insert(id, meta);
    }
    Ok(map)
}

fn db_corrupt(_conn: &Connection, e: rusqlite::Error) -> HlsyncError {
    HlsyncError::DbCorrupt {
        path: PathBuf::new(),
        cause: e.to_string(),
    }
}
