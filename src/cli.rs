// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `runtree`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runtree",
    version,
    about = "Run composable task trees across the directories of a repository.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNTREE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Echo every command before running it.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the execution plan without running anything.
    Plan {
        /// Emit the plan and path mappings as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the tasks available from the current directory.
    List,
    /// Run the root tree, or the named tasks in order.
    Run {
        #[arg(value_name = "TASK")]
        tasks: Vec<String>,
    },
    /// Print every directory a task can run in.
    Shims,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
