//! End-to-end integration test: build two real directory trees on disk, walk them, match by
//! content, build a plan, execute it, and confirm the target now has the source's layout
//! without any bytes having been copied (every file on disk afterward is a hard link back to
//! either a pre-existing target inode or a freshly linked-in source inode).

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use hlsync::db::{self, DbKind};
use hlsync::filter::Filter;
use hlsync::hash::HasherKind;
use hlsync::matcher;
use hlsync::plan::{self, PlanOptions};
use hlsync::set_engine::{self, Pruning, SortOrder};
use hlsync::tree;
use hlsync::types::OutputMode;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

fn open_db_for(root: &Path) -> db::Db {
    let db_path = db::resolve_db_path(root, None, db::DEFAULT_PREFIX);
    db::open(&db_path, &HasherKind::Fast32, DbKind::Online).unwrap()
}

fn build_tree_with_hashes(root: &Path) -> hlsync::tree::Tree {
    let filter = Filter::from_specs(&[]);
    let mut db = open_db_for(root);
    let mut t = tree::build_online_tree(root, &db, &filter).unwrap();
    for entry in &mut t.entries {
        if entry.hash.is_none() {
            let abs = root.join(entry.min_path());
            entry.hash = Some(HasherKind::Fast32.hash_file(&abs).unwrap());
        }
    }
    db::upsert_entries(&mut db.conn, &t.entries).unwrap();
    t
}

#[test]
fn sync_relinks_renamed_and_new_files_without_copying_bytes() {
    let source_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    // Source: "a.txt" holds content that the target already has under a different name, and
    // "new.txt" is new content the target has never seen.
    write(&source_dir.path().join("a.txt"), "hello world");
    write(&source_dir.path().join("new.txt"), "brand new content");

    // Target: same "hello world" bytes, but under "old.txt".
    write(&target_dir.path().join("old.txt"), "hello world");

    let source = build_tree_with_hashes(source_dir.path());
    let target = build_tree_with_hashes(target_dir.path());

    let old_ino = ino(&target_dir.path().join("old.txt"));

    let matching = matcher::build_matching(&source.entries, &target.entries, false);
    assert_eq!(matching.pairs.len(), 1, "only the shared-content file should match");
    assert_eq!(matching.unmatched_source.len(), 1, "new.txt has no target counterpart");

    let ops = plan::build_plan(&target, &source, &matching, PlanOptions::default()).unwrap();
    assert!(!ops.is_empty());

    plan::execute_plan(target_dir.path(), &ops, false).unwrap();

    let a_path = target_dir.path().join("a.txt");
    assert!(a_path.exists(), "target should now have a.txt");
    assert!(!target_dir.path().join("old.txt").exists(), "old.txt should have been renamed away");
    assert_eq!(ino(&a_path), old_ino, "a.txt must be the same inode as old.txt, not a copy");

    let new_path = target_dir.path().join("new.txt");
    assert!(new_path.exists());
    assert_eq!(fs::read_to_string(&new_path).unwrap(), "brand new content");
}

#[test]
fn matcher_reports_unmatched_target_files_rather_than_dropping_them() {
    let source_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    write(&source_dir.path().join("keep.txt"), "shared");
    write(&target_dir.path().join("keep.txt"), "shared");
    write(&target_dir.path().join("orphan.txt"), "target-only content");

    let source = build_tree_with_hashes(source_dir.path());
    let target = build_tree_with_hashes(target_dir.path());

    let matching = matcher::build_matching(&source.entries, &target.entries, false);
    assert_eq!(matching.pairs.len(), 1);
    assert_eq!(matching.unmatched_target.len(), 1);

    let ops = plan::build_plan(&target, &source, &matching, PlanOptions::default()).unwrap();
    // The matched pair already has the same relative path, so the plan has nothing to do, and
    // the unmatched target file is left untouched (unmatched files are never removed).
    assert!(ops.is_empty());
    assert!(target_dir.path().join("orphan.txt").exists());
}

#[test]
fn fdupes_finds_cross_tree_duplicates_by_distinct_file_id() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    write(&dir_a.path().join("x.txt"), "duplicated");
    write(&dir_b.path().join("y.txt"), "duplicated");
    write(&dir_b.path().join("unique.txt"), "only here");

    let tree_a = build_tree_with_hashes(dir_a.path());
    let tree_b = build_tree_with_hashes(dir_b.path());

    let lines = set_engine::fdupes(
        &[tree_a, tree_b],
        Pruning::default(),
        OutputMode::File,
        SortOrder::FirstEmitted,
    );
    let names: HashSet<_> = lines.iter().map(|l| l.path.file_name().unwrap().to_str().unwrap().to_string()).collect();
    assert!(names.contains("x.txt") || names.contains("y.txt"));
    assert!(!names.contains("unique.txt"));
}

#[test]
fn cmp_distinguishes_identical_different_and_missing() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    write(&first_dir.path().join("same.txt"), "same bytes");
    write(&second_dir.path().join("same.txt"), "same bytes");

    write(&first_dir.path().join("changed.txt"), "version one");
    write(&second_dir.path().join("changed.txt"), "version two");

    write(&first_dir.path().join("only-first.txt"), "only on first");

    let first = build_tree_with_hashes(first_dir.path());
    let second = build_tree_with_hashes(second_dir.path());

    let report = set_engine::cmp(&first, &second);
    assert_eq!(report.identical.len(), 1);
    assert_eq!(report.different.len(), 1);
    assert_eq!(report.missing_on_second.len(), 1);
    assert!(report.missing_on_first.is_empty());
}
