//! Entry point: parse arguments, build the effective configuration, dispatch to the matching
//! command handler, and map errors to exit codes (§6 "Exit codes").
//!
//! Grounded in the teacher's `main.rs` (parse -> setup logging -> setup cancellation -> match
//! on the command -> map `Err` to a process exit code).

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use hlsync::cli::{Cli, Command};
use hlsync::config;
use hlsync::error::HlsyncError;
use hlsync::{cancel, commands, logging};

const EXIT_USAGE: u8 = 1;
const EXIT_IO: u8 = 2;
const EXIT_DB: u8 = 3;
const EXIT_PARTIAL_PLAN: u8 = 4;
const EXIT_NO_RESULTS: u8 = 5;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::setup_logging(cli.global.verbose);

    let cancel_requested = match cancel::setup_ctrlc_handler() {
        Ok(flag) => flag,
        Err(e) => {
            log::error!("failed to install signal handler: {e}");
            return ExitCode::from(EXIT_IO);
        }
    };

    match run(&cli, &cancel_requested) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NO_RESULTS),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn primary_root(dirs: &[std::path::PathBuf]) -> &std::path::Path {
    dirs.first().map(|p| p.as_path()).unwrap_or_else(|| std::path::Path::new("."))
}

/// Dispatch one command. Returns `Ok(true)` for an ordinary success, `Ok(false)` only for a
/// set-engine query whose answer was empty (distinguished from an error, but still worth a
/// distinct exit code for scripts that search for something, per §6).
fn run(cli: &Cli, cancel_requested: &Arc<AtomicBool>) -> anyhow::Result<bool> {
    match &cli.command {
        Command::Update { dir } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::update(dir, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Rehash { dir } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::rehash(dir, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Subdir { dir, subdir } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::subdir(dir, subdir, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Mkoffline { dir, out } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::mkoffline(dir, out, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Cleandb { dir } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::cleandb(dir, &cfg)?;
            Ok(true)
        }
        Command::Lookup { dir, path } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::lookup(dir, path, &cfg)?;
            Ok(true)
        }
        Command::Sync { target, source } => {
            let cfg = config::build_config(&cli.global, target);
            commands::sync(target, source, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Rsync { source, target } => {
            let cfg = config::build_config(&cli.global, target);
            commands::rsync(source, target, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Syncr { target, source } => {
            let cfg = config::build_config(&cli.global, source);
            commands::syncr(target, source, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Cmp { first, second } => {
            let cfg = config::build_config(&cli.global, first);
            commands::cmp(first, second, &cfg, cancel_requested)?;
            Ok(true)
        }
        Command::Fdupes { dirs, output } => {
            let cfg = config::build_config(&cli.global, primary_root(dirs));
            commands::fdupes(dirs, &cfg, cancel_requested, output)
        }
        Command::Onall { dirs, output } => {
            let cfg = config::build_config(&cli.global, primary_root(dirs));
            commands::onall(dirs, &cfg, cancel_requested, output)
        }
        Command::Onfirstonly { dirs, output } => {
            let cfg = config::build_config(&cli.global, primary_root(dirs));
            commands::onfirstonly(dirs, &cfg, cancel_requested, output)
        }
        Command::Onlastonly { dirs, output } => {
            let cfg = config::build_config(&cli.global, primary_root(dirs));
            commands::onlastonly(dirs, &cfg, cancel_requested, output)
        }
        Command::Search { dirs, patterns, output } => {
            let cfg = config::build_config(&cli.global, primary_root(dirs));
            commands::search(dirs, patterns, &cfg, cancel_requested, output)
        }
        Command::Check { dir } => {
            let cfg = config::build_config(&cli.global, dir);
            commands::check(dir, &cfg)?;
            Ok(true)
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<HlsyncError>() {
        Some(HlsyncError::DbSchemaMismatch { .. } | HlsyncError::HashKindMismatch { .. } | HlsyncError::DbCorrupt { .. } | HlsyncError::DbOpenFailed { .. }) => {
            EXIT_DB
        }
        Some(HlsyncError::PartialPlanFailure { .. }) => EXIT_PARTIAL_PLAN,
        Some(HlsyncError::FileUnreadable { .. } | HlsyncError::DirInaccessible { .. }) => EXIT_IO,
        Some(HlsyncError::OperationCancelled) => EXIT_IO,
        Some(_) => EXIT_USAGE,
        None => EXIT_IO,
    }
}
