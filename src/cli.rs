//! Command-line surface (§6 "Command surface"): sixteen verbs over a shared set of global
//! options. The teacher's own `Cli` is a single flat command (it only ever indexes); this
//! crate's sixteen verbs are genuinely distinct operations, so `clap`'s derive `Subcommand`
//! replaces the teacher's flat struct — the idiomatic clap shape for "one global option set,
//! many operations", while the global-option struct itself (`GlobalArgs`) keeps the teacher's
//! flat, `#[arg(long, short)]`-per-field style.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hlsync")]
#[command(about = "Reconcile a target file tree to a source tree by hard-link surgery, no byte copies.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Global options (§6): include/exclude pattern stack, size caps, dry-run, DB location
/// policy, hasher selection, worker count. Available to every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Include pattern, sugar for `--filter '+PATTERN'`. Repeatable.
    #[arg(long = "include", global = true, action = clap::ArgAction::Append)]
    pub include: Vec<String>,

    /// Exclude pattern, sugar for `--filter '-PATTERN'`. Repeatable.
    #[arg(long = "exclude", global = true, action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Raw ordered filter rule (`+PATTERN` or `-PATTERN`); applied after --include/--exclude
    /// sugar, in the order given, so mix these when relative ordering between an include and
    /// an exclude actually matters. Repeatable.
    #[arg(long = "filter", global = true, action = clap::ArgAction::Append)]
    pub filter: Vec<String>,

    /// Skip files larger than this many bytes.
    #[arg(long, global = true)]
    pub max_size: Option<u64>,

    /// Drop files smaller than this many bytes (pruning, §4.4).
    #[arg(long, global = true)]
    pub min_size: Option<u64>,

    /// Match files by size alone, skipping hash comparison.
    #[arg(long, global = true)]
    pub size_only: bool,

    /// Compute and log the plan without touching the target tree.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Database filename prefix (default: `hlsync`).
    #[arg(long, global = true)]
    pub db_prefix: Option<String>,

    /// Directory to search for / create the database in, instead of the tree root.
    #[arg(long, global = true)]
    pub db_root_dir: Option<PathBuf>,

    /// Explicit database file path, bypassing prefix-based discovery entirely.
    #[arg(long, global = true)]
    pub db_location: Option<PathBuf>,

    /// Hasher: `fast32`, `fast64`, or a path to an external hashing program.
    #[arg(long, global = true)]
    pub hasher: Option<String>,

    /// Hashing worker thread count (default: FD-limit-aware, derived from available parallelism).
    #[arg(long, short = 'j', global = true)]
    pub workers: Option<usize>,

    /// Fold paths case-insensitively when reconciling against the target (P4).
    #[arg(long, global = true)]
    pub case_insensitive: bool,

    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to a `.hlsync.toml` to use instead of `<tree root>/.hlsync.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Output granularity shared by every set-engine query command (§4.4 "path vs. file toggle").
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Emit one line per hard link instead of one line per file.
    #[arg(long)]
    pub hard_links: bool,

    /// Emit one line per file, listing every hard link it has.
    #[arg(long)]
    pub all_links: bool,

    /// Sort output by size, largest first (default: first-emitted order).
    #[arg(long)]
    pub size_desc: bool,
}

impl OutputArgs {
    pub fn mode(&self) -> crate::types::OutputMode {
        if self.hard_links {
            crate::types::OutputMode::HardLinks
        } else if self.all_links {
            crate::types::OutputMode::AllLinks
        } else {
            crate::types::OutputMode::File
        }
    }

    pub fn order(&self) -> crate::set_engine::SortOrder {
        if self.size_desc {
            crate::set_engine::SortOrder::SizeDescending
        } else {
            crate::set_engine::SortOrder::FirstEmitted
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hash every new or changed file under `dir` and commit to its database.
    Update { dir: PathBuf },

    /// Like `update`, but ignores cached hashes and rehashes every file.
    Rehash { dir: PathBuf },

    /// Rehash only the files under `dir/subdir`, leaving the rest of the database alone.
    Subdir { dir: PathBuf, subdir: PathBuf },

    /// Snapshot `dir`'s hash database and directory structure into a standalone offline file.
    Mkoffline { dir: PathBuf, out: PathBuf },

    /// Remove database rows for files no longer present under `dir`.
    Cleandb { dir: PathBuf },

    /// Print the cached `(size, mtime, hash)` for one path, if present.
    Lookup { dir: PathBuf, path: PathBuf },

    /// Reconcile `target` to match `source` (directory or offline database) by hard-link surgery.
    Sync { target: PathBuf, source: PathBuf },

    /// `rsync`-style argument order for `sync`: `rsync SOURCE TARGET` mutates `TARGET`.
    Rsync { source: PathBuf, target: PathBuf },

    /// `sync`, source and target swapped: `syncr A B` is `sync B A` (mutates `source`).
    Syncr { target: PathBuf, source: PathBuf },

    /// Report identical / different / missing / type-mismatched paths between two trees.
    Cmp { first: PathBuf, second: PathBuf },

    /// List groups of duplicate files across one or more trees.
    Fdupes {
        dirs: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List content groups that have at least one file in every given tree.
    Onall {
        dirs: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List content groups present only in the first tree.
    Onfirstonly {
        dirs: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List content groups present only in the last tree.
    Onlastonly {
        dirs: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List files whose relative path matches any of the given glob patterns.
    Search {
        dirs: Vec<PathBuf>,
        #[arg(long = "pattern", action = clap::ArgAction::Append)]
        patterns: Vec<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rehash every cached file and report mismatches against the stored hash (scenario 5, bitrot).
    Check { dir: PathBuf },
}
