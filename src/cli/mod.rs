//! CLI module for ensemble
//!
//! Provides command-line interface parsing for the `ensemble` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ensemble - parallel analysis orchestrator
///
/// Decomposes a query into focused sub-queries, runs specialist workers
/// concurrently and synthesizes their answers into one report.
#[derive(Parser, Debug)]
#[command(
    name = "ensemble",
    version,
    about = "ensemble - parallel analysis orchestrator",
    long_about = "Decomposes a query into focused sub-queries, runs specialist workers\n\
                  concurrently and synthesizes their answers into one report.",
    after_help = "EXAMPLES:\n    \
                  ensemble run \"Compare the Civic vs Corolla under $40k\"\n    \
                  ensemble run --json \"Is the Model 3 reliable?\"\n    \
                  ensemble plan \"Analyze everything about the Mustang\"\n    \
                  ensemble --config my.toml workers list"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "ensemble.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a query with the configured workers
    Run {
        /// The question to analyze
        query: String,

        /// Per-worker time limit in seconds (overrides the config)
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Print the full pipeline output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the validated plan for a query without running workers
    Plan {
        /// The question to plan
        query: String,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and report warnings
        #[arg(long)]
        validate: bool,
    },

    /// Manage workers
    #[command(subcommand)]
    Workers(WorkerCommands),
}

/// Worker management subcommands
#[derive(Subcommand, Debug)]
pub enum WorkerCommands {
    /// List all configured workers
    List,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
