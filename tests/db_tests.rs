//! Hash database integration tests: open/create, upsert + load round-trip, prune, compact,
//! mark_offline, and the header-mismatch failure modes (§3, §4.1 testable property 7).

use hlsync::db::{self, DbKind};
use hlsync::hash::HasherKind;
use hlsync::types::{FileEntry, FileId, Hash};
use std::collections::HashSet;

fn entry(device: u64, inode: u64, size: u64, mtime: i64, hash: Option<u64>) -> FileEntry {
    FileEntry {
        file_id: FileId::new(device, inode),
        size,
        mtime,
        hash: hash.map(Hash),
        paths: Vec::new(),
    }
}

#[test]
fn open_creates_schema_and_is_reopenable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");

    {
        let db = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();
        assert_eq!(db.kind, DbKind::Online);
    }
    // Lock was released when the first handle dropped; a second open must succeed.
    let db = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();
    assert_eq!(db.kind, DbKind::Online);
}

#[test]
fn upsert_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");
    let mut db = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();

    let entries = vec![
        entry(1, 100, 10, 1_000, Some(42)),
        entry(1, 101, 20, 2_000, None),
    ];
    db::upsert_entries(&mut db.conn, &entries).unwrap();

    let loaded = db::load_entries(&db.conn).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[&FileId::new(1, 100)], (10, 1_000, Some(Hash(42))));
    assert_eq!(loaded[&FileId::new(1, 101)], (20, 2_000, None));
}

#[test]
fn upsert_overwrites_existing_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");
    let mut db = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();

    db::upsert_entries(&mut db.conn, &[entry(1, 100, 10, 1_000, None)]).unwrap();
    db::upsert_entries(&mut db.conn, &[entry(1, 100, 10, 1_000, Some(7))]).unwrap();

    let loaded = db::load_entries(&db.conn).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[&FileId::new(1, 100)].2, Some(Hash(7)));
}

#[test]
fn prune_drops_dead_entries_and_keeps_live_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");
    let mut db = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();

    db::upsert_entries(
        &mut db.conn,
        &[entry(1, 100, 10, 1_000, None), entry(1, 101, 20, 2_000, None)],
    )
    .unwrap();

    let mut live: HashSet<FileId> = HashSet::new();
    live.insert(FileId::new(1, 100));
    let removed = db::prune_entries(&mut db.conn, &live).unwrap();
    assert_eq!(removed, 1);

    let loaded = db::load_entries(&db.conn).unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains_key(&FileId::new(1, 100)));

    db::compact(&db.conn).unwrap();
}

#[test]
fn mark_offline_flips_kind_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");
    let mut db = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();
    db::mark_offline(&mut db).unwrap();
    assert_eq!(db.kind, DbKind::Offline);
    drop(db);

    let reopened = db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap();
    assert_eq!(reopened.kind, DbKind::Offline);
}

#[test]
fn reopen_with_different_hasher_is_a_hash_kind_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");
    drop(db::open(&path, &HasherKind::Fast32, DbKind::Online).unwrap());

    let err = db::open(&path, &HasherKind::Fast64, DbKind::Online).unwrap_err();
    assert!(matches!(err, hlsync::error::HlsyncError::HashKindMismatch { .. }));
}

#[test]
fn offline_path_table_round_trips() {
    use std::path::PathBuf;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hlsync");
    let mut db = db::open(&path, &HasherKind::Fast32, DbKind::Offline).unwrap();

    db::upsert_entries(&mut db.conn, &[entry(1, 100, 10, 1_000, Some(9))]).unwrap();
    db::write_paths(
        &mut db.conn,
        &[
            (FileId::new(1, 100), PathBuf::from("a/one.txt")),
            (FileId::new(1, 100), PathBuf::from("a/one-hardlink.txt")),
        ],
    )
    .unwrap();

    let paths = db::load_paths(&db.conn).unwrap();
    let mut links = paths[&FileId::new(1, 100)].clone();
    links.sort();
    assert_eq!(links, vec![PathBuf::from("a/one-hardlink.txt"), PathBuf::from("a/one.txt")]);
}
