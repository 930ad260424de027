//! `cmp`, `fdupes`, `onall`, `onfirstonly`, `onlastonly`, `search` (component G, §4.4): the
//! read-only set-engine queries, each opening N locations (online directories or offline
//! snapshots, freely mixed) and delegating to [`crate::set_engine`].

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::set_engine::{self, OutputLine, Pruning, SortOrder};
use crate::tree::Tree;
use crate::types::OutputMode;

fn open_all(dirs: &[PathBuf], cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<Vec<Tree>> {
    dirs.iter().map(|d| super::open_location_tree(d, cfg, cancel)).collect()
}

fn pruning(cfg: &Config) -> Pruning {
    Pruning {
        min_size: cfg.min_size,
        max_size: cfg.max_size,
        size_only: cfg.size_only,
    }
}

fn print_lines(lines: &[OutputLine], mode: OutputMode) {
    for line in lines {
        match mode {
            OutputMode::AllLinks if !line.also_paths.is_empty() => {
                print!("{}", line.path.display());
                for also in &line.also_paths {
                    print!(" {}", also.display());
                }
                println!();
            }
            _ => println!("{}", line.path.display()),
        }
    }
}

/// Returns `Ok(true)` iff at least one line was printed, so callers can surface "query
/// produced no results" as a distinct, non-error outcome (§6 "Exit codes").
pub fn fdupes(dirs: &[PathBuf], cfg: &Config, cancel: &Arc<AtomicBool>, output: &crate::cli::OutputArgs) -> Result<bool> {
    let trees = open_all(dirs, cfg, cancel)?;
    let lines = set_engine::fdupes(&trees, pruning(cfg), output.mode(), output.order());
    print_lines(&lines, output.mode());
    Ok(!lines.is_empty())
}

pub fn onall(dirs: &[PathBuf], cfg: &Config, cancel: &Arc<AtomicBool>, output: &crate::cli::OutputArgs) -> Result<bool> {
    let trees = open_all(dirs, cfg, cancel)?;
    let lines = set_engine::onall(&trees, pruning(cfg), output.mode(), output.order());
    print_lines(&lines, output.mode());
    Ok(!lines.is_empty())
}

pub fn onfirstonly(dirs: &[PathBuf], cfg: &Config, cancel: &Arc<AtomicBool>, output: &crate::cli::OutputArgs) -> Result<bool> {
    let trees = open_all(dirs, cfg, cancel)?;
    let lines = set_engine::onfirstonly(&trees, pruning(cfg), output.mode(), output.order());
    print_lines(&lines, output.mode());
    Ok(!lines.is_empty())
}

pub fn onlastonly(dirs: &[PathBuf], cfg: &Config, cancel: &Arc<AtomicBool>, output: &crate::cli::OutputArgs) -> Result<bool> {
    let trees = open_all(dirs, cfg, cancel)?;
    let lines = set_engine::onlastonly(&trees, pruning(cfg), output.mode(), output.order());
    print_lines(&lines, output.mode());
    Ok(!lines.is_empty())
}

pub fn search(
    dirs: &[PathBuf],
    patterns: &[String],
    cfg: &Config,
    cancel: &Arc<AtomicBool>,
    output: &crate::cli::OutputArgs,
) -> Result<bool> {
    let trees = open_all(dirs, cfg, cancel)?;
    let lines = set_engine::search(&trees, patterns, output.mode(), output.order());
    print_lines(&lines, output.mode());
    Ok(!lines.is_empty())
}

pub fn cmp(first: &Path, second: &Path, cfg: &Config, cancel: &Arc<AtomicBool>) -> Result<()> {
    let first_tree = super::open_location_tree(first, cfg, cancel)?;
    let second_tree = super::open_location_tree(second, cfg, cancel)?;
    let report = set_engine::cmp(&first_tree, &second_tree);

    use crate::logging::Colors;
    for path in &report.identical {
        log::debug!("identical: {}", path.display());
    }
    for path in &report.different {
        println!("{}", Colors::colorize(Colors::MODIFIED, &format!("different: {}", path.display())));
    }
    for path in &report.missing_on_first {
        println!("{}", Colors::colorize(Colors::REMOVED, &format!("missing on {}: {}", first.display(), path.display())));
    }
    for path in &report.missing_on_second {
        println!("{}", Colors::colorize(Colors::REMOVED, &format!("missing on {}: {}", second.display(), path.display())));
    }
    for path in &report.type_mismatch {
        println!("{}", Colors::colorize(Colors::MODIFIED, &format!("type mismatch: {}", path.display())));
    }
    log::info!(
        "{}: {} identical, {} different, {} missing-on-first, {} missing-on-second, {} type-mismatch",
        first.display(),
        report.identical.len(),
        report.different.len(),
        report.missing_on_first.len(),
        report.missing_on_second.len(),
        report.type_mismatch.len()
    );
    Ok(())
}
