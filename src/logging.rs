//! Leveled, colorized logging (§10.1), carried from the teacher's `utils::logger`.

use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let target = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, target, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .init();
}

/// Diff/plan output colors, carried from the teacher's `utils::logger::Colors`.
pub struct Colors;

impl Colors {
    pub const ADDED: &'static str = "green";
    pub const REMOVED: &'static str = "red";
    pub const MODIFIED: &'static str = "yellow";

    pub fn colorize(color: &str, text: &str) -> String {
        match color {
            "green" => text.green().to_string(),
            "red" => text.red().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
