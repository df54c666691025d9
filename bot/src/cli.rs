//! CLI command definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kirppu - chat bot that drafts marketplace listings from photos
#[derive(Parser)]
#[command(
    name = "kirppu",
    about = "Chat bot that turns item photos into published marketplace listings",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the bot (the default when no subcommand is given)
    Run {
        /// Talk to an in-memory ad service and a canned advisor instead
        /// of the real backends
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}
