//! `hlsync`: unidirectional, content-addressed reconciliation of two local file trees by
//! hard-link surgery. See `README.md` for the command-line surface and `DESIGN.md` for how
//! each piece below is grounded.

pub mod cancel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod fileid;
pub mod filter;
pub mod hash;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod set_engine;
pub mod tree;
pub mod types;
pub mod util;
