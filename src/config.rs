//! Ambient configuration (§10.3): an optional `.hlsync.toml` at a tree root, overlaid by CLI
//! flags the user actually passed. Same two-layer composition as the teacher's
//! `utils::nefaxer_toml` + `engine::cli::setup_opts`: file supplies defaults, CLI overrides
//! only the fields the user actually set.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::GlobalArgs;
use crate::db;
use crate::hash::HasherKind;
use crate::util::fd_limit;

/// Resolved, immutable configuration threaded through every command entry point (§9: "should
/// be passed as an explicit, immutable configuration value ... not stored in process-wide
/// mutable state").
#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered include/exclude stack, in `"+pattern"` / `"-pattern"` form (§6 contract).
    pub filter_specs: Vec<String>,
    pub max_size: Option<u64>,
    pub min_size: u64,
    pub size_only: bool,
    pub dry_run: bool,
    pub db_prefix: String,
    pub db_root_dir: Option<PathBuf>,
    pub db_location: Option<PathBuf>,
    pub hasher: HasherKind,
    pub workers: usize,
    pub case_insensitive: bool,
    pub verbose: bool,
}

/// Hardware parallelism, capped by the process's FD limit so a wide tree walk never hits
/// EMFILE (§10.5 "FD-limit-aware worker capping").
fn default_workers() -> usize {
    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    match fd_limit::max_workers_by_fd_limit() {
        Some(cap) => hw.min(cap).max(1),
        None => hw,
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            filter_specs: Vec::new(),
            max_size: None,
            min_size: 0,
            size_only: false,
            dry_run: false,
            db_prefix: db::DEFAULT_PREFIX.to_string(),
            db_root_dir: None,
            db_location: None,
            hasher: HasherKind::default(),
            workers: default_workers(),
            case_insensitive: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlFile {
    #[serde(default)]
    settings: TomlSettings,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSettings {
    filter: Option<Vec<String>>,
    max_size: Option<u64>,
    min_size: Option<u64>,
    size_only: Option<bool>,
    db_prefix: Option<String>,
    db_root_dir: Option<PathBuf>,
    hasher: Option<String>,
    workers: Option<usize>,
    case_insensitive: Option<bool>,
    verbose: Option<bool>,
}

/// Load `.hlsync.toml` from `dir` (or `explicit`, when `--config` was passed). Returns `None`
/// if the file is missing or fails to parse (a parse failure is logged, not fatal — the
/// command proceeds with defaults and CLI flags only).
fn load_toml(dir: &Path, explicit: Option<&Path>) -> Option<TomlFile> {
    let path = explicit.map(|p| p.to_path_buf()).unwrap_or_else(|| dir.join(".hlsync.toml"));
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {e}", path.display()))
        .ok()
}

fn hasher_from_str(s: &str) -> HasherKind {
    match s {
        "fast32" => HasherKind::Fast32,
        "fast64" => HasherKind::Fast64,
        external => HasherKind::External(PathBuf::from(external)),
    }
}

/// Build the effective [`Config`] for a command rooted at `tree_root`: start from defaults,
/// overlay `.hlsync.toml` (file supplies values the user didn't otherwise set), then overlay
/// CLI flags (only the ones the user actually passed override the file).
pub fn build_config(global: &GlobalArgs, tree_root: &Path) -> Config {
    let mut cfg = Config::default();

    if let Some(file) = load_toml(tree_root, global.config.as_deref()) {
        let s = file.settings;
        if let Some(v) = s.filter {
            cfg.filter_specs = v;
        }
        if let Some(v) = s.max_size {
            cfg.max_size = Some(v);
        }
        if let Some(v) = s.min_size {
            cfg.min_size = v;
        }
        if let Some(v) = s.size_only {
            cfg.size_only = v;
        }
        if let Some(v) = s.db_prefix {
            cfg.db_prefix = v;
        }
        if s.db_root_dir.is_some() {
            cfg.db_root_dir = s.db_root_dir;
        }
        if let Some(v) = s.hasher {
            cfg.hasher = hasher_from_str(&v);
        }
        if let Some(v) = s.workers {
            cfg.workers = v;
        }
        if let Some(v) = s.case_insensitive {
            cfg.case_insensitive = v;
        }
        if let Some(v) = s.verbose {
            cfg.verbose = v;
        }
    }

    // CLI overlay: every field here is additive/override-when-passed, mirroring the
    // teacher's `apply_cli_opt!` (only overwrite when the user actually set the flag).
    for pat in &global.include {
        cfg.filter_specs.push(format!("+{pat}"));
    }
    for pat in &global.exclude {
        cfg.filter_specs.push(format!("-{pat}"));
    }
    cfg.filter_specs.extend(global.filter.iter().cloned());
    if let Some(v) = global.max_size {
        cfg.max_size = Some(v);
    }
    if let Some(v) = global.min_size {
        cfg.min_size = v;
    }
    if global.size_only {
        cfg.size_only = true;
    }
    if global.dry_run {
        cfg.dry_run = true;
    }
    if let Some(v) = &global.db_prefix {
        cfg.db_prefix = v.clone();
    }
    if global.db_root_dir.is_some() {
        cfg.db_root_dir = global.db_root_dir.clone();
    }
    if global.db_location.is_some() {
        cfg.db_location = global.db_location.clone();
    }
    if let Some(v) = &global.hasher {
        cfg.hasher = hasher_from_str(v);
    }
    if let Some(v) = global.workers {
        cfg.workers = v;
    }
    if global.case_insensitive {
        cfg.case_insensitive = true;
    }
    if global.verbose {
        cfg.verbose = true;
    }

    cfg
}

/// Resolve the database path to use for `root` under this configuration (§6: explicit
/// `--db-location` wins, then `--db-root-dir` relocates the search/creation directory, else
/// the tree root itself).
pub fn db_path_for(cfg: &Config, root: &Path) -> PathBuf {
    if let Some(explicit) = &cfg.db_location {
        return explicit.clone();
    }
    let search_dir = cfg.db_root_dir.as_deref().unwrap_or(root);
    db::resolve_db_path(search_dir, None, &cfg.db_prefix)
}
