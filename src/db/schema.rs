//! SQLite schema for the hash database (§6 "Database file").
//!
//! `meta` is the header: schema version, hasher identifier, database kind.
//! `entries` is the per-file_id hash cache (§3 "Hash DB"). `paths` exists only for
//! offline databases, recording the tree structure alongside the hashes.

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    device INTEGER NOT NULL,
    inode  INTEGER NOT NULL,
    size   INTEGER NOT NULL,
    mtime  INTEGER NOT NULL,
    hash   INTEGER,
    PRIMARY KEY (device, inode)
);

CREATE TABLE IF NOT EXISTS paths (
    device INTEGER NOT NULL,
    inode  INTEGER NOT NULL,
    path   BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_paths_file_id ON paths(device, inode);
"#;

pub const WAL_PRAGMAS: &str = r#"
PRAGMA synchronous = NORMAL;
PRAGMA wal_autocheckpoint = 10000;
PRAGMA journal_size_limit = 67108864;
"#;

pub const UPSERT_ENTRY_SQL: &str =
    "INSERT OR REPLACE INTO entries (device, inode, size, mtime, hash) VALUES (?1, ?2, ?3, ?4, ?5)";

pub const INSERT_PATH_SQL: &str = "INSERT INTO paths (device, inode, path) VALUES (?1, ?2, ?3)";

/// `DbKind` distinguishes an online tree's companion database (no `paths` rows) from an
/// offline snapshot (carries `paths`, substitutable for a live directory, §3 "Hash DB").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbKind {
    Online,
    Offline,
}

impl DbKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DbKind::Online => "online",
            DbKind::Offline => "offline",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "offline" => DbKind::Offline,
            _ => DbKind::Online,
        }
    }
}
