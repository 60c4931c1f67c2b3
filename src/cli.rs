//! CLI subcommand definitions.
//!
//! Uses clap derive:
//! - `start` (default) -- start the polling server
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live classroom polling gateway.
#[derive(Parser, Debug)]
#[command(
    name = "pollroom",
    version = env!("CARGO_PKG_VERSION"),
    about = "pollroom: live classroom polling over WebSocket"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the server (default when no subcommand is given).
    Start {
        /// Path to a JSON5 config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured port.
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the configured bind address.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print version information.
    Version,
}
