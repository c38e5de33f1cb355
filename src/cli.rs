use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Route planning, comparison, live traffic and trip cost tools over JSON-RPC (stdio).
#[derive(Debug, Parser)]
#[command(name = "routeplanner", version, about)]
pub struct Cli {
    /// Path to the config file (default: ~/.routeplanner/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the tools on stdin/stdout (default)
    Serve,
    /// Write a default config file and exit
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the tool catalog as JSON and exit
    ListTools,
}
