//! Path table for offline databases (§3 "Hash DB": directory structure embedded alongside
//! hashes so a DB file can substitute for a live directory, §6 `mkoffline`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::HlsyncError;
use crate::types::FileId;
use crate::util::path_bytes::{bytes_to_path, path_to_bytes};

use super::schema::INSERT_PATH_SQL;

fn wrap(e: rusqlite::Error) -> HlsyncError {
    HlsyncError::DbCorrupt {
        path: PathBuf::new(),
        cause: e.to_string(),
    }
}

/// Replace the `paths` table with `entries`: `(file_id, relative path)` pairs, one row per
/// hard link. Stored as raw OS bytes (§6: "no UTF-8 normalisation").
pub fn write_paths(conn: &mut Connection, entries: &[(FileId, PathBuf)]) -> Result<(), HlsyncError> {
    let tx = conn.transaction().map_err(wrap)?;
    tx.execute("DELETE FROM paths", []).map_err(wrap)?;
    {
        let mut stmt = tx.prepare(INSERT_PATH_SQL).map_err(wrap)?;
        for (id, path) in entries {
            stmt.execute(rusqlite::params![
                id.0 as i64,
                id.1 as i64,
                path_to_bytes(path)
            ])
            .map_err(wrap)?;
        }
    }
    tx.commit().map_err(wrap)?;
    Ok(())
}

/// Load `file_id -> paths` from the `paths` table (offline tree structure, §3).
pub fn load_paths(conn: &Connection) -> Result<HashMap<FileId, Vec<PathBuf>>, HlsyncError> {
    let mut stmt = conn
        .prepare("SELECT device, inode, path FROM paths")
        .map_err(wrap)?;
    let rows = stmt
        .query_map([], |row| {
            let device: i64 = row.get(0)?;
            let inode: i64 = row.get(1)?;
            let raw: Vec<u8> = row.get(2)?;
            Ok((FileId::new(device as u64, inode as u64), raw))
        })
        .map_err(wrap)?;

    let mut map: HashMap<FileId, Vec<PathBuf>> = HashMap::new();
    for row in rows {
        let (id, raw) = row.map_err(wrap)?;
        map.entry(id).or_default().push(bytes_to_path(&raw));
    }
    Ok(map)
}

/// True if `path`'s basename matches the reserved database-name pattern (I4): never
/// reported as a file entry by the tree walk.
pub fn is_reserved_db_name(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(rest) = name.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
        return false;
    };
    let Some(digits) = rest.strip_suffix(".db") else {
        return false;
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
