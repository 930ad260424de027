//! Set engine (component G, §4.4): given N tree views and a query kind, groups files by
//! content key and emits groups according to the query's membership rule.
//!
//! Grounded in the teacher's `Entry` collection pattern (`engine::core::collect_entries`):
//! gather every tree's entries up front, then group in memory with a `HashMap`, the same
//! shape the teacher uses before any DB write. There is no streaming join across trees in the
//! teacher's own code to lean on directly (the teacher never compares two trees to each
//! other), so the grouping here generalises the teacher's single-tree `HashMap`-by-key idiom
//! to N trees keyed by content rather than by path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::filter::Filter;
use crate::tree::Tree;
use crate::types::{CmpReport, ContentKey, FileEntry, OutputMode};

/// One content-equivalence group: which tree index each member file came from.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: ContentKey,
    /// (tree index, file entry) for every file sharing `key`, across all input trees.
    pub members: Vec<(usize, FileEntry)>,
}

impl Group {
    fn tree_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|(i, _)| *i)
    }

    fn total_files(&self) -> usize {
        self.members.len()
    }
}

/// Pruning knobs shared by every set-engine query (§4.4 "Pruning options").
#[derive(Clone, Copy, Debug, Default)]
pub struct Pruning {
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub size_only: bool,
}

impl Pruning {
    fn keep(&self, size: u64) -> bool {
        size >= self.min_size && self.max_size.is_none_or(|cap| size <= cap)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    SizeDescending,
    FirstEmitted,
}

/// Group every file across `trees` by content key, applying `pruning` (§4.4).
fn group_all(trees: &[Tree], pruning: Pruning) -> Vec<Group> {
    let mut groups: HashMap<ContentKey, Vec<(usize, FileEntry)>> = HashMap::new();
    for (idx, tree) in trees.iter().enumerate() {
        for entry in &tree.entries {
            if !pruning.keep(entry.size) {
                continue;
            }
            groups
                .entry(entry.content_key(pruning.size_only))
                .or_default()
                .push((idx, entry.clone()));
        }
    }
    groups
        .into_iter()
        .map(|(key, members)| Group { key, members })
        .collect()
}

/// One line of query output: a resolved path plus the size of its file, kept for sort order.
/// In [`OutputMode::AllLinks`], `also_paths` carries the file's remaining hard links (sorted,
/// excluding `path` itself); every other mode leaves it empty.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub path: PathBuf,
    pub size: u64,
    pub also_paths: Vec<PathBuf>,
}

fn emit_group(group: &Group, mode: OutputMode, out: &mut Vec<OutputLine>) {
    // Members sharing a file-id within the same tree are hard links of one file; collapse
    // them before deciding what "one file" means for this group (§4.4 scenario 6: fdupes
    // counts distinct file-ids, not distinct paths).
    let mut by_file: HashMap<(usize, crate::types::FileId), &FileEntry> = HashMap::new();
    for (idx, entry) in &group.members {
        by_file.insert((*idx, entry.file_id), entry);
    }
    let mut files: Vec<&FileEntry> = by_file.into_values().collect();
    files.sort_by(|a, b| a.min_path().cmp(b.min_path()));

    for entry in files {
        match mode {
            OutputMode::File => out.push(OutputLine {
                path: entry.min_path().clone(),
                size: entry.size,
                also_paths: Vec::new(),
            }),
            OutputMode::HardLinks => {
                let mut paths = entry.paths.clone();
                paths.sort();
                for p in paths {
                    out.push(OutputLine {
                        path: p,
                        size: entry.size,
                        also_paths: Vec::new(),
                    });
                }
            }
            OutputMode::AllLinks => {
                let primary = entry.min_path().clone();
                let mut rest: Vec<PathBuf> = entry.paths.iter().filter(|p| **p != primary).cloned().collect();
                rest.sort();
                out.push(OutputLine {
                    path: primary,
                    size: entry.size,
                    also_paths: rest,
                });
            }
        }
    }
}

fn sort_lines(lines: &mut [OutputLine], order: SortOrder) {
    match order {
        SortOrder::SizeDescending => lines.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path))),
        SortOrder::FirstEmitted => {} // already in first-emitted order (insertion order preserved).
    }
}

/// **fdupes** (§4.4): groups of size >= 2, counting distinct file-ids (hard links of the same
/// file never count as a duplicate of themselves — scenario 6).
pub fn fdupes(trees: &[Tree], pruning: Pruning, mode: OutputMode, order: SortOrder) -> Vec<OutputLine> {
    let groups = group_all(trees, pruning);
    let mut out = Vec::new();
    for group in &groups {
        let distinct_files: std::collections::HashSet<(usize, crate::types::FileId)> =
            group.members.iter().map(|(i, e)| (*i, e.file_id)).collect();
        if distinct_files.len() < 2 {
            continue;
        }
        emit_group(group, mode, &mut out);
    }
    sort_lines(&mut out, order);
    out
}

/// **onall** (§4.4): groups with at least one file from every tree.
pub fn onall(trees: &[Tree], pruning: Pruning, mode: OutputMode, order: SortOrder) -> Vec<OutputLine> {
    let n = trees.len();
    let groups = group_all(trees, pruning);
    let mut out = Vec::new();
    for group in &groups {
        let present: std::collections::HashSet<usize> = group.tree_indices().collect();
        if present.len() == n {
            emit_group(group, mode, &mut out);
        }
    }
    sort_lines(&mut out, order);
    out
}

/// **onfirstonly** (§4.4): groups with >= 1 file from tree 0 and zero from trees 1..N.
pub fn onfirstonly(trees: &[Tree], pruning: Pruning, mode: OutputMode, order: SortOrder) -> Vec<OutputLine> {
    let groups = group_all(trees, pruning);
    let mut out = Vec::new();
    for group in &groups {
        let has_first = group.tree_indices().any(|i| i == 0);
        let has_rest = group.tree_indices().any(|i| i != 0);
        if has_first && !has_rest {
            emit_group(group, mode, &mut out);
        }
    }
    sort_lines(&mut out, order);
    out
}

/// **onlastonly** (§4.4): symmetric to [`onfirstonly`] against the last tree.
pub fn onlastonly(trees: &[Tree], pruning: Pruning, mode: OutputMode, order: SortOrder) -> Vec<OutputLine> {
    let last = trees.len().saturating_sub(1);
    let groups = group_all(trees, pruning);
    let mut out = Vec::new();
    for group in &groups {
        let has_last = group.tree_indices().any(|i| i == last);
        let has_rest = group.tree_indices().any(|i| i != last);
        if has_last && !has_rest {
            emit_group(group, mode, &mut out);
        }
    }
    sort_lines(&mut out, order);
    out
}

/// **cmp** (§4.4): per relative path appearing in either of exactly two trees, report
/// identical / different / missing-on-one-side / type-mismatch. Reads no file bytes beyond
/// the hashes already attached to each tree's entries (scenario 6's "round trip" property
/// depends on this: `mkoffline` then `cmp` must answer identically to a live `cmp`).
pub fn cmp(first: &Tree, second: &Tree) -> CmpReport {
    let mut by_path_first: HashMap<&Path, &FileEntry> = HashMap::new();
    for e in &first.entries {
        for p in &e.paths {
            by_path_first.insert(p.as_path(), e);
        }
    }
    let mut by_path_second: HashMap<&Path, &FileEntry> = HashMap::new();
    for e in &second.entries {
        for p in &e.paths {
            by_path_second.insert(p.as_path(), e);
        }
    }

    let mut all_paths: Vec<&Path> = by_path_first
        .keys()
        .chain(by_path_second.keys())
        .copied()
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    all_paths.sort();

    let mut report = CmpReport::default();
    for path in all_paths {
        let a = by_path_first.get(path);
        let b = by_path_second.get(path);
        // A file on one side colliding with a directory at the same relative path on the
        // other side is a type mismatch, not a content comparison (§4.4 "plus type mismatches").
        if (a.is_some() && second.directories.contains(path)) || (b.is_some() && first.directories.contains(path)) {
            report.type_mismatch.push(path.to_path_buf());
            continue;
        }
        match (a, b) {
            (Some(a), Some(b)) => {
                let equal = a.size == b.size && a.hash.is_some() && a.hash == b.hash;
                if equal {
                    report.identical.push(path.to_path_buf());
                } else {
                    report.different.push(path.to_path_buf());
                }
            }
            (Some(_), None) => report.missing_on_second.push(path.to_path_buf()),
            (None, Some(_)) => report.missing_on_first.push(path.to_path_buf()),
            (None, None) => unreachable!("path came from one of the two maps"),
        }
    }
    report
}

/// **search** (§4.4): files whose relative path matches any of `patterns`, reused as a single
/// all-include [`Filter`] stack (a pattern matches iff the filter would *include* that path).
pub fn search(trees: &[Tree], patterns: &[String], mode: OutputMode, order: SortOrder) -> Vec<OutputLine> {
    let specs: Vec<String> = patterns.iter().map(|p| format!("+{p}")).collect();
    let filter = Filter::from_specs(&specs);
    let mut out = Vec::new();
    for tree in trees {
        for entry in &tree.entries {
            let matches = entry.paths.iter().any(|p| {
                let seg_owned: Vec<String> = p
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                let seg_refs: Vec<&str> = seg_owned.iter().map(|s| s.as_str()).collect();
                filter.include(&seg_refs, false)
            });
            if !matches {
                continue;
            }
            match mode {
                OutputMode::HardLinks => {
                    let mut paths = entry.paths.clone();
                    paths.sort();
                    for p in paths {
                        out.push(OutputLine {
                            path: p,
                            size: entry.size,
                            also_paths: Vec::new(),
                        });
                    }
                }
                OutputMode::File => out.push(OutputLine {
                    path: entry.min_path().clone(),
                    size: entry.size,
                    also_paths: Vec::new(),
                }),
                OutputMode::AllLinks => {
                    let primary = entry.min_path().clone();
                    let mut rest: Vec<PathBuf> = entry.paths.iter().filter(|p| **p != primary).cloned().collect();
                    rest.sort();
                    out.push(OutputLine {
                        path: primary,
                        size: entry.size,
                        also_paths: rest,
                    });
                }
            }
        }
    }
    sort_lines(&mut out, order);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileEntry, FileId, Hash};
    use std::collections::BTreeSet;

    fn entry(dev: u64, ino: u64, size: u64, hash: u64, paths: &[&str]) -> FileEntry {
        FileEntry {
            file_id: FileId::new(dev, ino),
            size,
            mtime: 0,
            hash: Some(Hash(hash)),
            paths: paths.iter().map(PathBuf::from).collect(),
        }
    }

    fn tree(entries: Vec<FileEntry>) -> Tree {
        Tree {
            root: None,
            entries,
            directories: BTreeSet::new(),
        }
    }

    #[test]
    fn fdupes_counts_distinct_file_ids_not_paths() {
        // Scenario 6: a,b distinct-id content X; c,d are one hard-linked file content Y.
        let t = tree(vec![
            entry(1, 1, 1, 42, &["a"]),
            entry(1, 2, 1, 42, &["b"]),
            entry(1, 3, 1, 99, &["c", "d"]),
        ]);
        let lines = fdupes(&[t], Pruning::default(), OutputMode::File, SortOrder::FirstEmitted);
        let paths: Vec<_> = lines.iter().map(|l| l.path.to_string_lossy().to_string()).collect();
        assert_eq!(paths, vec!["a", "b"]);
    }

    #[test]
    fn onall_requires_every_tree() {
        let t1 = tree(vec![entry(1, 1, 1, 1, &["shared"])]);
        let t2 = tree(vec![entry(2, 1, 1, 1, &["shared"])]);
        let t3 = tree(vec![entry(3, 1, 1, 2, &["only-in-three"])]);
        let lines = onall(&[t1, t2, t3], Pruning::default(), OutputMode::File, SortOrder::FirstEmitted);
        assert_eq!(lines.len(), 0);
    }

    #[test]
    fn onfirstonly_excludes_files_present_elsewhere() {
        let t1 = tree(vec![
            entry(1, 1, 1, 1, &["unique-to-one"]),
            entry(1, 2, 1, 2, &["shared"]),
        ]);
        let t2 = tree(vec![entry(2, 1, 1, 2, &["shared"])]);
        let lines = onfirstonly(&[t1, t2], Pruning::default(), OutputMode::File, SortOrder::FirstEmitted);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].path, PathBuf::from("unique-to-one"));
    }

    #[test]
    fn cmp_reports_missing_and_different() {
        let first = tree(vec![
            entry(1, 1, 1, 1, &["same"]),
            entry(1, 2, 1, 2, &["changed"]),
            entry(1, 3, 1, 3, &["only-first"]),
        ]);
        let second = tree(vec![
            entry(2, 1, 1, 1, &["same"]),
            entry(2, 2, 1, 99, &["changed"]),
            entry(2, 4, 1, 4, &["only-second"]),
        ]);
        let report = cmp(&first, &second);
        assert_eq!(report.identical, vec![PathBuf::from("same")]);
        assert_eq!(report.different, vec![PathBuf::from("changed")]);
        assert_eq!(report.missing_on_first, vec![PathBuf::from("only-second")]);
        assert_eq!(report.missing_on_second, vec![PathBuf::from("only-first")]);
    }

    #[test]
    fn search_matches_glob_patterns() {
        let t = tree(vec![
            entry(1, 1, 1, 1, &["docs/readme.md"]),
            entry(1, 2, 1, 2, &["src/main.rs"]),
        ]);
        let lines = search(&[t], &["docs/**".to_string()], OutputMode::File, SortOrder::FirstEmitted);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].path, PathBuf::from("docs/readme.md"));
    }
}
