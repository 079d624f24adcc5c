// src/config/build.rs

//! Turn a validated task file into a runnable tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::compose::{Cmd, Parallel, Runnable, Serial, Task};
use crate::config::model::{ConfigFile, PathsConfig, RawConfigFile, TaskConfig};
use crate::config::validate::reference_order;
use crate::engine::{Engine, EngineSettings};
use crate::errors::{Result, RuntreeError};
use crate::fs::FileSystem;
use crate::paths::{PathFilter, detect_by_file, run_in};

/// Engine settings for a task file living in `root_dir`.
pub fn settings_from_config(cfg: &ConfigFile, root_dir: impl Into<PathBuf>) -> EngineSettings {
    EngineSettings {
        root_dir: root_dir.into(),
        tool_dir: PathBuf::from(&cfg.config.tool_dir),
        shutdown_grace: Duration::from_secs(cfg.config.shutdown_grace_secs),
    }
}

/// Build the engine for `cfg`.
///
/// Tasks are constructed in reference order, so a task referenced from
/// several places is one value with one identity everywhere. Marker-file
/// detection walks `root_dir` through `fs`.
pub fn build_engine(
    cfg: &ConfigFile,
    root_dir: impl Into<PathBuf>,
    fs: Arc<dyn FileSystem>,
) -> Result<Engine> {
    let root_dir = root_dir.into();
    let settings = settings_from_config(cfg, &root_dir);

    let raw = RawConfigFile {
        config: cfg.config.clone(),
        task: cfg.task.clone(),
        root: cfg.root.clone(),
    };
    let order = reference_order(&raw)?;

    let mut built: HashMap<String, Runnable> = HashMap::new();
    for name in order {
        let task_cfg = cfg
            .task
            .get(&name)
            .ok_or_else(|| RuntreeError::TaskNotFound(name.clone()))?;
        let runnable = build_task(&name, task_cfg, &built, &root_dir, &fs)?;
        debug!(task = %name, "built task");
        built.insert(name, runnable);
    }

    let root = match &cfg.root {
        Some(root) => match (&root.serial, &root.parallel) {
            (Some(names), _) => Runnable::from(Serial::new(lookup(names, &built)?)),
            (None, Some(names)) => Runnable::from(Parallel::new(lookup(names, &built)?)),
            (None, None) => {
                return Err(RuntreeError::Config(
                    "[root] needs exactly one of `serial` or `parallel`".to_string(),
                ));
            }
        },
        None => {
            let visible: Vec<String> = cfg
                .task
                .iter()
                .filter(|(_, t)| !t.hidden)
                .map(|(name, _)| name.clone())
                .collect();
            Runnable::from(Serial::new(lookup(&visible, &built)?))
        }
    };

    Ok(Engine::new(root).with_settings(settings))
}

fn build_task(
    name: &str,
    cfg: &TaskConfig,
    built: &HashMap<String, Runnable>,
    root_dir: &Path,
    fs: &Arc<dyn FileSystem>,
) -> Result<Runnable> {
    let body = match (&cfg.run, &cfg.serial, &cfg.parallel) {
        (Some(argv), _, _) => {
            let (program, args) = argv.split_first().ok_or_else(|| {
                RuntreeError::Config(format!("task '{}' has an empty `run` command", name))
            })?;
            Runnable::from(Cmd::new(program.clone(), args.iter().cloned()))
        }
        (None, Some(names), _) => Runnable::from(Serial::new(lookup(names, built)?)),
        (None, None, Some(names)) => Runnable::from(Parallel::new(lookup(names, built)?)),
        (None, None, None) => {
            return Err(RuntreeError::Config(format!(
                "task '{}' needs one of `run`, `serial` or `parallel`",
                name
            )));
        }
    };

    let mut builder = Task::builder(name, cfg.usage.clone(), body);
    if cfg.hidden {
        builder = builder.hidden();
    }
    let task = builder.try_build()?;

    match &cfg.paths {
        Some(paths) => Ok(Runnable::from(build_filter(task, paths, root_dir, fs)?)),
        None => Ok(Runnable::from(task)),
    }
}

fn build_filter(
    task: Task,
    paths: &PathsConfig,
    root_dir: &Path,
    fs: &Arc<dyn FileSystem>,
) -> Result<PathFilter> {
    let mut builder = run_in(task);
    if !paths.detect.is_empty() {
        builder = builder.detect_with(detect_by_file(fs.clone(), root_dir, &paths.detect)?);
    }
    for pattern in &paths.include {
        builder = builder.include(pattern.clone());
    }
    for pattern in &paths.exclude {
        builder = builder.exclude(pattern.clone());
    }
    for (skipped, dirs) in &paths.skip {
        builder = if dirs.is_empty() {
            builder.skip_task_everywhere(skipped.clone())
        } else {
            builder.skip_task(skipped.clone(), dirs.iter().cloned())
        };
    }
    builder.build()
}

fn lookup(names: &[String], built: &HashMap<String, Runnable>) -> Result<Vec<Runnable>> {
    names
        .iter()
        .map(|name| {
            built
                .get(name)
                .cloned()
                .ok_or_else(|| RuntreeError::TaskNotFound(name.clone()))
        })
        .collect()
}
