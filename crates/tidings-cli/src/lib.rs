//! tidings - progress and decision reporting for package retrieval
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Terminal front-end for `tidings-core`.
//!
//! # Overview
//!
//! The CLI wires the core reporters to a real terminal: progress lines and
//! notices on stderr, decisions read from stdin. The `simulate` command plays
//! the part of a retrieval engine, driving a plan of sources and packages
//! through one report session and honouring every decision it gets back.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.tidings/
//! └── config.toml   # Optional settings (interactive, colors, ...)
//! ```

pub mod cmd;
pub mod config;
pub mod sim;
pub mod ui;

pub use config::{Settings, tidings_home};

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tidings_core::Decision;

#[derive(Debug, Parser)]
#[command(name = "tidings")]
#[command(author, version, about = "tidings - retrieval progress and decision reporting")]
pub struct Cli {
    /// Read settings from this file instead of ~/.tidings/config.toml
    #[arg(long, global = true, env = "TIDINGS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Never wait for input; answer problems with the default decision
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Decision used when running unattended (abort, retry, ignore)
    #[arg(long, global = true)]
    pub decision: Option<Decision>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show dispatch diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a retrieval plan through the reporters
    Simulate {
        /// Plan file (TOML)
        plan: PathBuf,
    },
    /// Print the effective configuration
    Config,
}
