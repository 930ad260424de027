//! Upsert, prune (`cleandb`), and compact operations on the `entries` table (§3 "Hash DB"
//! lifecycle). Batched transactions, grounded in the teacher's `db_ops::indexer` module.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::HlsyncError;
use crate::types::{FileEntry, FileId};

use super::schema::UPSERT_ENTRY_SQL;

/// Batch size for insert/update transactions (balances transaction overhead vs. round-trips).
pub const UPSERT_BATCH_SIZE: usize = 1000;

fn wrap(e: rusqlite::Error) -> HlsyncError {
    HlsyncError::DbCorrupt {
        path: Default::default(),
        cause: e.to_string(),
    }
}

/// Insert or replace rows for `entries`, chunked into transactions of `UPSERT_BATCH_SIZE`.
pub fn upsert_entries(conn: &mut Connection, entries: &[FileEntry]) -> Result<(), HlsyncError> {
    for chunk in entries.chunks(UPSERT_BATCH_SIZE) {
        let tx = conn.transaction().map_err(wrap)?;
        {
            let mut stmt = tx.prepare(UPSERT_ENTRY_SQL).map_err(wrap)?;
            for e in chunk {
                let hash = e.hash.map(|h| h.0 as i64);
                stmt.execute(rusqlite::params![
                    e.file_id.0 as i64,
                    e.file_id.1 as i64,
                    e.size as i64,
                    e.mtime,
                    hash
                ])
                .map_err(wrap)?;
            }
        }
        tx.commit().map_err(wrap)?;
    }
    Ok(())
}

/// Drop every entry whose file-id is not in `live_ids` (`cleandb`, §3). Returns rows removed.
pub fn prune_entries(conn: &mut Connection, live_ids: &HashSet<FileId>) -> Result<usize, HlsyncError> {
    let existing: Vec<FileId> = {
        let mut stmt = conn
            .prepare("SELECT device, inode FROM entries")
            .map_err(wrap)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FileId::new(
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, i64>(1)? as u64,
                ))
            })
            .map_err(wrap)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(wrap)?
    };

    let stale: Vec<FileId> = existing
        .into_iter()
        .filter(|id| !live_ids.contains(id))
        .collect();

    let tx = conn.transaction().map_err(wrap)?;
    {
        let mut stmt = tx
            .prepare("DELETE FROM entries WHERE device = ?1 AND inode = ?2")
            .map_err(wrap)?;
        for id in &stale {
            stmt.execute(rusqlite::params![id.0 as i64, id.1 as i64])
                .map_err(wrap)?;
        }
    }
    tx.commit().map_err(wrap)?;
    Ok(stale.len())
}

/// Reclaim space from a database that has shed rows via `prune_entries` (`cleandb`, §3).
pub fn compact(conn: &Connection) -> Result<(), HlsyncError> {
    conn.execute_batch("VACUUM;").map_err(wrap)
}
