//! `sync`, `rsync`, `syncr` (§4.2, §4.3): reconcile one online tree to match another by
//! hard-link surgery. `rsync`/`syncr` are argument-order aliases of `sync` (§6's verb list
//! names them "for completeness" without fixing their argument order) — `rsync SRC TGT`
//! follows the `rsync(1)` convention of mutating its second argument; `syncr A B` is `sync B
//! A`, for scripts that want to swap direction without re-ordering arguments by hand.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::logging::Colors;
use crate::matcher;
use crate::plan::{self, PlanOptions};
use crate::util::root_guard;

pub fn sync(target: &Path, source: &Path, cfg: &crate::config::Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    if target.is_file() {
        bail!("sync target {} must be a live directory, not an offline database", target.display());
    }
    if root_guard::running_as_root() {
        log::warn!("running as root: about to rename/link/unlink under {}", target.display());
    }

    let (target_tree, _target_db) = super::open_online_tree(target, cfg, cancel)?;
    let source_tree = super::open_location_tree(source, cfg, cancel)?;

    let matching = matcher::build_matching(&source_tree.entries, &target_tree.entries, cfg.size_only);
    let opts = PlanOptions {
        case_insensitive: cfg.case_insensitive,
    };
    let ops = plan::build_plan(&target_tree, &source_tree, &matching, opts)?;

    if ops.is_empty() {
        log::info!("{} already matches {}", target.display(), source.display());
        return Ok(());
    }

    log::info!(
        "{}: {} operations ({} unmatched target, {} unmatched source)",
        target.display(),
        ops.len(),
        matching.unmatched_target.len(),
        matching.unmatched_source.len()
    );
    if cfg.verbose || cfg.dry_run {
        for op in &ops {
            log::info!("{}", Colors::colorize(color_for(op), &op.to_string()));
        }
    }

    match plan::execute_plan(target, &ops, cfg.dry_run) {
        Ok(()) => {
            log::info!("{}: {} operations applied", target.display(), ops.len());
            Ok(())
        }
        Err(e @ crate::error::HlsyncError::PartialPlanFailure { completed, total, .. }) => {
            log::warn!("{}: {} of {} operations applied before failure", target.display(), completed.len(), total);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn color_for(op: &plan::Operation) -> &'static str {
    match op {
        plan::Operation::Mkdir(_) | plan::Operation::Rename { .. } | plan::Operation::Link { .. } => Colors::ADDED,
        plan::Operation::Unlink(_) | plan::Operation::Rmdir(_) => Colors::REMOVED,
    }
}

pub fn rsync(source: &Path, target: &Path, cfg: &crate::config::Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    sync(target, source, cfg, cancel)
}

pub fn syncr(target: &Path, source: &Path, cfg: &crate::config::Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    sync(source, target, cfg, cancel)
}
