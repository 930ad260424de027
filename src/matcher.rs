//! Match engine (component E, §4.2): pairs target file-ids to source file-ids by content
//! key under hard-link multiplicity, preferring pairings that maximise path overlap so the
//! plan builder emits renames instead of link+unlink pairs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::types::{ContentKey, FileEntry, FileId};

#[derive(Debug, Default)]
pub struct Matching {
    /// (target file-id, source file-id) pairs.
    pub pairs: Vec<(FileId, FileId)>,
    pub unmatched_source: Vec<FileId>,
    pub unmatched_target: Vec<FileId>,
}

fn group_by_key(entries: &[FileEntry], size_only: bool) -> HashMap<ContentKey, Vec<FileId>> {
    let mut groups: HashMap<ContentKey, Vec<FileId>> = HashMap::new();
    for e in entries {
        groups.entry(e.content_key(size_only)).or_default().push(e.file_id);
    }
    groups
}

struct Candidate {
    target: FileId,
    source: FileId,
    overlap: usize,
    tie_path: PathBuf,
}

fn path_overlap(a: &FileEntry, b: &FileEntry) -> usize {
    let b_paths: HashSet<&Path> = b.paths.iter().map(|p| p.as_path()).collect();
    a.paths.iter().filter(|p| b_paths.contains(p.as_path())).count()
}

/// Build the matching between `source` and `target` file entries (§4.2 contract).
pub fn build_matching(source: &[FileEntry], target: &[FileEntry], size_only: bool) -> Matching {
    let source_by_id: HashMap<FileId, &FileEntry> = source.iter().map(|e| (e.file_id, e)).collect();
    let target_by_id: HashMap<FileId, &FileEntry> = target.iter().map(|e| (e.file_id, e)).collect();

    let source_groups = group_by_key(source, size_only);
    let target_groups = group_by_key(target, size_only);

    let mut matching = Matching::default();

    let mut keys: Vec<ContentKey> = source_groups
        .keys()
        .chain(target_groups.keys())
        .copied()
        .collect();
    keys.sort();
    keys.dedup();

    for key in &keys {
        let s_ids = source_groups.get(key).cloned().unwrap_or_default();
        let t_ids = target_groups.get(key).cloned().unwrap_or_default();

        // Step 2: candidates with positive path overlap, most-overlap-first, ties broken by
        // the lexicographically smallest path between the two files.
        let mut candidates = Vec::new();
        for &t in &t_ids {
            let t_entry = target_by_id[&t];
            for &s in &s_ids {
                let s_entry = source_by_id[&s];
                let overlap = path_overlap(s_entry, t_entry);
                if overlap > 0 {
                    let tie_path = std::cmp::min(t_entry.min_path(), s_entry.min_path()).clone();
                    candidates.push(Candidate {
                        target: t,
                        source: s,
                        overlap,
                        tie_path,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| b.overlap.cmp(&a.overlap).then_with(|| a.tie_path.cmp(&b.tie_path)));

        let mut used_t: HashSet<FileId> = HashSet::new();
        let mut used_s: HashSet<FileId> = HashSet::new();
        for c in candidates {
            if used_t.contains(&c.target) || used_s.contains(&c.source) {
                continue;
            }
            matching.pairs.push((c.target, c.source));
            used_t.insert(c.target);
            used_s.insert(c.source);
        }

        // Step 3: remaining file-ids paired arbitrarily but deterministically, in
        // lexicographic-minimum-path order.
        let mut rem_t: Vec<FileId> = t_ids.into_iter().filter(|id| !used_t.contains(id)).collect();
        let mut rem_s: Vec<FileId> = s_ids.into_iter().filter(|id| !used_s.contains(id)).collect();
        rem_t.sort_by_key(|id| target_by_id[id].min_path().clone());
        rem_s.sort_by_key(|id| source_by_id[id].min_path().clone());

        let common = rem_t.len().min(rem_s.len());
        for i in 0..common {
            matching.pairs.push((rem_t[i], rem_s[i]));
        }
        matching.unmatched_target.extend(rem_t.into_iter().skip(common));
        matching.unmatched_source.extend(rem_s.into_iter().skip(common));
    }

    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileId;

    fn entry(dev: u64, ino: u64, size: u64, hash: u64, paths: &[&str]) -> FileEntry {
        FileEntry {
            file_id: FileId::new(dev, ino),
            size,
            mtime: 0,
            hash: Some(crate::types::Hash(hash)),
            paths: paths.iter().map(std::path::PathBuf::from).collect(),
        }
    }

    #[test]
    fn rename_prefers_path_overlap() {
        // target `b/one.txt` should match source `a/one.txt` (scenario 1).
        let source = vec![entry(1, 1, 1, 42, &["a/one.txt"])];
        let target = vec![entry(2, 1, 1, 42, &["b/one.txt"])];
        let m = build_matching(&source, &target, false);
        assert_eq!(m.pairs, vec![(FileId::new(2, 1), FileId::new(1, 1))]);
        assert!(m.unmatched_source.is_empty());
        assert!(m.unmatched_target.is_empty());
    }

    #[test]
    fn unmatched_target_is_reported_not_dropped() {
        let source = vec![entry(1, 1, 1, 1, &["keep"])];
        let target = vec![
            entry(2, 1, 1, 1, &["keep"]),
            entry(2, 2, 1, 99, &["extra"]),
        ];
        let m = build_matching(&source, &target, false);
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.unmatched_target, vec![FileId::new(2, 2)]);
        assert!(m.unmatched_source.is_empty());
    }

    #[test]
    fn hardlink_creation_matches_one_file_to_multi_path_source() {
        let source = vec![entry(1, 1, 1, 1, &["p", "q"])];
        let target = vec![entry(2, 1, 1, 1, &["p"])];
        let m = build_matching(&source, &target, false);
        assert_eq!(m.pairs, vec![(FileId::new(2, 1), FileId::new(1, 1))]);
    }
}
