// src/lib.rs

pub mod cli;
pub mod compose;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

pub use crate::compose::{
    Cmd, Func, Parallel, Runnable, Serial, Task, TaskBuilder, cmd, func, parallel, serial,
};
pub use crate::engine::{Engine, EngineSettings, ExecuteOptions, ExecutionPlan, RunContext};
pub use crate::errors::RuntreeError;
pub use crate::exec::{CancelToken, Output};
pub use crate::paths::{PathFilter, detect_by_file, run_in};

use crate::cli::{CliArgs, Command};
use crate::config::{build_engine, config_root_dir, load_and_validate};
use crate::engine::{render_task_list, render_tree};
use crate::fs::RealFileSystem;
use crate::paths::path_utils::relative_str;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and tree construction
/// - the invocation directory relative to the task file
/// - Ctrl-C handling
/// - the selected subcommand
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root_dir = config_root_dir(&config_path);
    let engine = build_engine(&cfg, &root_dir, Arc::new(RealFileSystem))?;
    let cwd = invocation_dir(&root_dir);
    debug!(root = %root_dir.display(), %cwd, "loaded task file");

    match args.command.unwrap_or(Command::Run { tasks: Vec::new() }) {
        Command::Plan { json } => {
            let plan = engine.plan().await?;
            if json {
                println!("{}", plan.to_json()?);
            } else {
                print!("{}", render_tree(&plan));
            }
        }
        Command::List => {
            let plan = engine.plan().await?;
            print!("{}", render_task_list(&plan, &cwd));
        }
        Command::Shims => {
            let plan = engine.plan().await?;
            for dir in plan.shim_dirs() {
                println!("{dir}");
            }
        }
        Command::Run { tasks } => {
            let cancel = CancelToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        eprintln!("failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    cancel.cancel();
                });
            }

            let options = ExecuteOptions {
                cwd,
                verbose: args.verbose,
                ..ExecuteOptions::default()
            };
            if tasks.is_empty() {
                engine.execute(cancel, options).await?;
            } else {
                engine.execute_tasks(&tasks, cancel, options).await?;
            }
        }
    }

    Ok(())
}

/// The process working directory relative to the task file's directory.
///
/// Invocations from outside the tree are treated as coming from its root.
fn invocation_dir(root_dir: &Path) -> String {
    let Ok(current) = std::env::current_dir() else {
        return String::new();
    };
    let root = if root_dir.is_absolute() {
        root_dir.to_path_buf()
    } else {
        current.join(root_dir)
    };
    match relative_str(&root, &current) {
        Some(rel) => rel,
        None => {
            warn!(
                cwd = %current.display(),
                root = %root.display(),
                "invoked outside the task file's directory; running from its root"
            );
            String::new()
        }
    }
}
