//! Plan builder & executor (component F, §4.3): turns a [`Matching`](crate::matcher::Matching)
//! into an ordered, collision-free sequence of `mkdir` / `rename` / `link` / `unlink` /
//! `rmdir` operations on the target tree, then executes (or, in dry-run, only logs) them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::HlsyncError;
use crate::matcher::Matching;
use crate::tree::Tree;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Mkdir(PathBuf),
    Rename { from: PathBuf, to: PathBuf },
    Link { from: PathBuf, to: PathBuf },
    Unlink(PathBuf),
    Rmdir(PathBuf),
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Mkdir(p) => write!(f, "mkdir {}", p.display()),
            Operation::Rename { from, to } => write!(f, "rename {} -> {}", from.display(), to.display()),
            Operation::Link { from, to } => write!(f, "link {} -> {}", from.display(), to.display()),
            Operation::Unlink(p) => write!(f, "unlink {}", p.display()),
            Operation::Rmdir(p) => write!(f, "rmdir {}", p.display()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlanOptions {
    /// P4: treat paths differing only in case as identical (case-insensitive, case-preserving
    /// target filesystem).
    pub case_insensitive: bool,
}

fn fold(path: &Path, case_insensitive: bool) -> PathBuf {
    if case_insensitive {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    } else {
        path.to_path_buf()
    }
}

/// One pending creation (rename-in or link-in) destined for `to`, coming from `from` (an
/// existing path of the same file on the target, or a stash path created to break a cycle).
#[derive(Clone, Debug)]
struct Create {
    from: PathBuf,
    to: PathBuf,
    via_rename: bool,
    pair_id: usize,
}

#[derive(Clone, Debug)]
struct Remove {
    path: PathBuf,
    pair_id: usize,
}

/// Build the plan that brings `target`'s path structure in line with `source`'s, for every
/// matched pair in `matching`. Unmatched files on either side are left untouched (§4.2, §4.3).
pub fn build_plan(
    target: &Tree,
    source: &Tree,
    matching: &Matching,
    opts: PlanOptions,
) -> Result<Vec<Operation>, HlsyncError> {
    let target_by_id = target.by_id();
    let source_by_id = source.by_id();

    // Occupancy: every path currently present on the target, mapped to its file-id.
    let mut occupied: HashMap<PathBuf, crate::types::FileId> = HashMap::new();
    for e in &target.entries {
        for p in &e.paths {
            occupied.insert(fold(p, opts.case_insensitive), e.file_id);
        }
    }
    // Directories known to exist on the target already (unfolded; case-insensitive lookups
    // fold at comparison time via `contains_dir`).
    let mut known_dirs: HashSet<PathBuf> = target.directories.iter().cloned().collect();
    known_dirs.insert(PathBuf::new());

    // P5: a create op must never target a path that's an ancestor-equal to an existing
    // non-directory entry, nor may a required ancestor directory coincide with an existing file.
    let existing_file_paths: HashSet<PathBuf> = occupied.keys().cloned().collect();

    let mut creates: Vec<Create> = Vec::new();
    let mut removes: Vec<Remove> = Vec::new();
    let mut creates_remaining: HashMap<usize, usize> = HashMap::new();

    for (pair_id, (t_id, s_id)) in matching.pairs.iter().enumerate() {
        let Some(t_entry) = target_by_id.get(t_id) else {
            continue;
        };
        let Some(s_entry) = source_by_id.get(s_id) else {
            continue;
        };

        let t_set: HashSet<PathBuf> = t_entry.paths.iter().map(|p| fold(p, opts.case_insensitive)).collect();
        let s_paths_folded: Vec<(PathBuf, &PathBuf)> = s_entry
            .paths
            .iter()
            .map(|p| (fold(p, opts.case_insensitive), p))
            .collect();

        let mut to_add: Vec<PathBuf> = s_paths_folded
            .iter()
            .filter(|(folded, _)| !t_set.contains(folded))
            .map(|(_, real)| (*real).clone())
            .collect();
        to_add.sort();

        let s_set: HashSet<PathBuf> = s_paths_folded.iter().map(|(f, _)| f.clone()).collect();
        let mut to_remove: Vec<PathBuf> = t_entry
            .paths
            .iter()
            .filter(|p| !s_set.contains(&fold(p, opts.case_insensitive)))
            .cloned()
            .collect();
        to_remove.sort();

        if to_add.is_empty() && to_remove.is_empty() {
            continue; // already in sync (testable property 4/5: idempotence, fixed point).
        }

        for p in &to_add {
            for ancestor in ancestors(p) {
                if existing_file_paths.contains(&fold(&ancestor, opts.case_insensitive))
                    && !contains_dir(&known_dirs, &ancestor, opts.case_insensitive)
                {
                    return Err(HlsyncError::TargetPathTypeConflict { path: ancestor });
                }
            }
        }

        // Pair as many to_remove/to_add entries as possible via rename (cheaper than a
        // link+unlink pair, and always safe under P1: a rename never drops the link count to
        // zero). A path of this file that survives untouched is the ideal source for any
        // `extra` creates beyond that pairing: prefer one not in `to_remove` outright. If every
        // current path is slated for removal and there are more removes than adds, reserve the
        // last `to_remove` entry out of the rename pairing instead, so it survives as a link
        // source until the scheduler's P1 gate lets it be removed (once this pair's other
        // creates have all landed). Otherwise (adds >= removes) every to_remove entry can be
        // renamed, and the first rename's destination doubles as the anchor for any remaining
        // extra creates.
        let retained: Option<PathBuf> = t_entry.paths.iter().find(|p| !to_remove.contains(p)).cloned();
        let common = to_add.len().min(to_remove.len());
        let anchor: PathBuf = match &retained {
            Some(p) => p.clone(),
            None if to_remove.len() > to_add.len() => to_remove[to_remove.len() - 1].clone(),
            None if common > 0 => to_add[0].clone(),
            None => t_entry.min_path().clone(),
        };

        for i in 0..common {
            creates.push(Create {
                from: to_remove[i].clone(),
                to: to_add[i].clone(),
                via_rename: true,
                pair_id,
            });
        }
        for extra in &to_add[common..] {
            creates.push(Create {
                from: anchor.clone(),
                to: extra.clone(),
                via_rename: false,
                pair_id,
            });
        }
        for extra in &to_remove[common..] {
            removes.push(Remove {
                path: extra.clone(),
                pair_id,
            });
        }

        let n_creates = common + to_add.len().saturating_sub(common);
        creates_remaining.insert(pair_id, n_creates);
    }

    schedule(creates, removes, creates_remaining, &mut occupied, &mut known_dirs, opts)
}

fn contains_dir(known_dirs: &HashSet<PathBuf>, d: &Path, case_insensitive: bool) -> bool {
    if !case_insensitive {
        return known_dirs.contains(d);
    }
    let folded = fold(d, true);
    known_dirs.iter().any(|k| fold(k, true) == folded)
}

fn ancestors(path: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut cur = path.parent();
    while let Some(dir) = cur {
        if dir.as_os_str().is_empty() {
            break;
        }
        out.push(dir.to_path_buf());
        cur = dir.parent();
    }
    out.reverse();
    out
}

static STASH_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn stash_name() -> PathBuf {
    let n = STASH_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    PathBuf::from(format!(".hlsync-stash-{n}"))
}

/// Topologically order `creates` (subject to P1/P2) and `removes` (subject to P1), inserting
/// stash links to break cycles (§4.3 "Ordering"). Also emits the `mkdir`/`rmdir` operations
/// required by P3.
fn schedule(
    mut creates: Vec<Create>,
    removes: Vec<Remove>,
    mut creates_remaining: HashMap<usize, usize>,
    occupied: &mut HashMap<PathBuf, crate::types::FileId>,
    known_dirs: &mut HashSet<PathBuf>,
    opts: PlanOptions,
) -> Result<Vec<Operation>, HlsyncError> {
    let mut plan = Vec::new();
    let mut removes: Vec<Remove> = removes;
    let case_insensitive = opts.case_insensitive;

    // Drive a synthetic file-id into occupied for a path we don't otherwise track (stash
    // targets are never looked up by id, only by "is this path free").
    let mut next_synthetic = crate::types::FileId::new(u64::MAX, 0);

    loop {
        let mut progressed = false;
        let mut still_pending = Vec::new();

        for c in creates.drain(..) {
            let dest = fold(&c.to, case_insensitive);
            if occupied.contains_key(&dest) {
                still_pending.push(c);
                continue;
            }
            emit_mkdir_chain(&c.to, known_dirs, &mut plan, case_insensitive);
            if c.via_rename {
                plan.push(Operation::Rename {
                    from: c.from.clone(),
                    to: c.to.clone(),
                });
                occupied.remove(&fold(&c.from, case_insensitive));
            } else {
                plan.push(Operation::Link {
                    from: c.from.clone(),
                    to: c.to.clone(),
                });
            }
            occupied.insert(dest, crate::types::FileId::new(0, 0));
            if let Some(n) = creates_remaining.get_mut(&c.pair_id) {
                *n -= 1;
            }
            progressed = true;
        }
        creates = still_pending;

        let mut still_pending_removes = Vec::new();
        for r in removes.drain(..) {
            if creates_remaining.get(&r.pair_id).copied().unwrap_or(0) > 0 {
                still_pending_removes.push(r);
                continue;
            }
            plan.push(Operation::Unlink(r.path.clone()));
            occupied.remove(&fold(&r.path, case_insensitive));
            progressed = true;
        }
        removes = still_pending_removes;

        if creates.is_empty() && removes.is_empty() {
            break;
        }
        if progressed {
            continue;
        }

        // Deadlock: break the first blocked create by stashing whoever currently occupies its
        // destination, then retry (§4.3 "stash link").
        let blocked = creates.first().expect("non-empty when deadlocked");
        let dest = fold(&blocked.to, case_insensitive);
        let occupant_path = blocked.to.clone();
        let stash = occupant_path
            .parent()
            .map(|p| p.join(stash_name()))
            .unwrap_or_else(stash_name);

        plan.push(Operation::Rename {
            from: occupant_path.clone(),
            to: stash.clone(),
        });
        occupied.remove(&dest);
        occupied.insert(fold(&stash, case_insensitive), next_synthetic);
        next_synthetic = crate::types::FileId::new(u64::MAX, next_synthetic.1 + 1);

        // Any pending create/remove that referenced `occupant_path` as its `from` now must
        // read from `stash` instead (the file actually lives there now).
        for c in creates.iter_mut() {
            if c.from == occupant_path {
                c.from = stash.clone();
            }
        }
        for r in removes.iter_mut() {
            if r.path == occupant_path {
                r.path = stash.clone();
            }
        }
    }

    emit_rmdirs(known_dirs, occupied, &mut plan, case_insensitive);

    Ok(plan)
}

fn emit_mkdir_chain(dest: &Path, known_dirs: &mut HashSet<PathBuf>, plan: &mut Vec<Operation>, case_insensitive: bool) {
    for ancestor in ancestors(dest) {
        if !contains_dir(known_dirs, &ancestor, case_insensitive) {
            known_dirs.insert(ancestor.clone());
            plan.push(Operation::Mkdir(ancestor));
        }
    }
}

/// After all creates/removes are scheduled, any directory that held target paths before the
/// plan but holds none of the surviving/created paths afterward is emptied; emit `Rmdir` for
/// it, deepest first (P3).
fn emit_rmdirs(
    known_dirs: &HashSet<PathBuf>,
    occupied: &HashMap<PathBuf, crate::types::FileId>,
    plan: &mut Vec<Operation>,
    case_insensitive: bool,
) {
    let mut still_used: HashSet<PathBuf> = HashSet::new();
    for p in occupied.keys() {
        for ancestor in ancestors(p) {
            still_used.insert(fold(&ancestor, case_insensitive));
        }
    }
    let mut empties: Vec<&PathBuf> = known_dirs
        .iter()
        .filter(|d| !d.as_os_str().is_empty() && !still_used.contains(&fold(d, case_insensitive)))
        .collect();
    // Deepest (most path components) first so a parent isn't removed before its now-empty child.
    empties.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for d in empties {
        plan.push(Operation::Rmdir(d.clone()));
    }
}

/// Execute `plan` against `target_root`. In dry-run mode, operations are only logged (§4.3
/// "Dry run"). On a mid-plan failure, returns `PartialPlanFailure` with the completed and
/// remaining operations (§4.3 "Failure semantics": no rollback, the target is never corrupted
/// since every step is rename/link/unlink).
pub fn execute_plan(target_root: &Path, plan: &[Operation], dry_run: bool) -> Result<(), HlsyncError> {
    if dry_run {
        for op in plan {
            log::info!("{op}");
        }
        return Ok(());
    }

    let mut completed = Vec::with_capacity(plan.len());
    for (i, op) in plan.iter().enumerate() {
        if let Err(cause) = apply_one(target_root, op) {
            return Err(HlsyncError::PartialPlanFailure {
                completed,
                remaining: plan[i..].to_vec(),
                total: plan.len(),
                cause,
            });
        }
        log::debug!("{op}");
        completed.push(op.clone());
    }
    Ok(())
}

fn apply_one(root: &Path, op: &Operation) -> Result<(), String> {
    match op {
        Operation::Mkdir(p) => {
            let abs = root.join(p);
            std::fs::create_dir_all(&abs).map_err(|e| e.to_string())
        }
        Operation::Rename { from, to } => {
            let abs_from = root.join(from);
            let abs_to = root.join(to);
            std::fs::rename(&abs_from, &abs_to).map_err(|e| {
                HlsyncError::TargetRenameFailed {
                    from: from.clone(),
                    to: to.clone(),
                    cause: e.to_string(),
                }
                .to_string()
            })
        }
        Operation::Link { from, to } => {
            let abs_from = root.join(from);
            let abs_to = root.join(to);
            std::fs::hard_link(&abs_from, &abs_to).map_err(|e| {
                HlsyncError::TargetLinkFailed {
                    from: from.clone(),
                    to: to.clone(),
                    cause: e.to_string(),
                }
                .to_string()
            })
        }
        Operation::Unlink(p) => {
            let abs = root.join(p);
            std::fs::remove_file(&abs).map_err(|e| {
                HlsyncError::TargetUnlinkFailed {
                    path: p.clone(),
                    cause: e.to_string(),
                }
                .to_string()
            })
        }
        Operation::Rmdir(p) => {
            let abs = root.join(p);
            match std::fs::remove_dir(&abs) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::Other || e.raw_os_error() == Some(39) => {
                    // Directory not actually empty (e.g. held an excluded file); not fatal.
                    log::warn!("{}: not empty, leaving in place", abs.display());
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileEntry, FileId, Hash};
    use std::collections::BTreeSet;

    fn tree(entries: Vec<FileEntry>, dirs: &[&str]) -> Tree {
        Tree {
            root: Some(PathBuf::from("/tmp/root")),
            entries,
            directories: dirs.iter().map(PathBuf::from).collect::<BTreeSet<_>>(),
        }
    }

    fn file(dev: u64, ino: u64, paths: &[&str]) -> FileEntry {
        FileEntry {
            file_id: FileId::new(dev, ino),
            size: 1,
            mtime: 0,
            hash: Some(Hash(1)),
            paths: paths.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn scenario_1_rename_with_mkdir_rmdir() {
        let source = tree(vec![file(1, 1, &["a/one.txt"])], &["a"]);
        let target = tree(vec![file(2, 1, &["b/one.txt"])], &["b"]);
        let matching = Matching {
            pairs: vec![(FileId::new(2, 1), FileId::new(1, 1))],
            unmatched_source: vec![],
            unmatched_target: vec![],
        };
        let plan = build_plan(&target, &source, &matching, PlanOptions::default()).unwrap();
        assert!(plan.contains(&Operation::Mkdir(PathBuf::from("a"))));
        assert!(plan.contains(&Operation::Rename {
            from: PathBuf::from("b/one.txt"),
            to: PathBuf::from("a/one.txt"),
        }));
        assert!(plan.contains(&Operation::Rmdir(PathBuf::from("b"))));
    }

    #[test]
    fn scenario_2_hardlink_creation_is_a_link_not_a_copy() {
        let source = tree(vec![file(1, 1, &["p", "q"])], &[]);
        let target = tree(vec![file(2, 1, &["p"])], &[]);
        let matching = Matching {
            pairs: vec![(FileId::new(2, 1), FileId::new(1, 1))],
            unmatched_source: vec![],
            unmatched_target: vec![],
        };
        let plan = build_plan(&target, &source, &matching, PlanOptions::default()).unwrap();
        assert_eq!(
            plan,
            vec![Operation::Link {
                from: PathBuf::from("p"),
                to: PathBuf::from("q"),
            }]
        );
    }

    #[test]
    fn scenario_3_two_cycle_uses_a_stash() {
        let source = tree(vec![file(1, 1, &["a"]), file(1, 2, &["b"])], &[]);
        let target = tree(vec![file(2, 1, &["a"]), file(2, 2, &["b"])], &[]);
        // target `a` holds source b's content, target `b` holds source a's content.
        let matching = Matching {
            pairs: vec![
                (FileId::new(2, 1), FileId::new(1, 2)),
                (FileId::new(2, 2), FileId::new(1, 1)),
            ],
            unmatched_source: vec![],
            unmatched_target: vec![],
        };
        let plan = build_plan(&target, &source, &matching, PlanOptions::default()).unwrap();
        let renames = plan
            .iter()
            .filter(|op| matches!(op, Operation::Rename { .. }))
            .count();
        assert_eq!(renames, 3, "expected stash + 2 final renames, got {plan:?}");
    }

    #[test]
    fn scenario_4_unmatched_target_is_never_touched() {
        let source = tree(vec![file(1, 1, &["keep"])], &[]);
        let target = tree(
            vec![file(2, 1, &["keep"]), file(2, 2, &["extra"])],
            &[],
        );
        let matching = Matching {
            pairs: vec![(FileId::new(2, 1), FileId::new(1, 1))],
            unmatched_source: vec![],
            unmatched_target: vec![FileId::new(2, 2)],
        };
        let plan = build_plan(&target, &source, &matching, PlanOptions::default()).unwrap();
        assert!(plan.is_empty());
    }
}
