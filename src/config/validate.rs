// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{BodyKind, ConfigFile, RawConfigFile};
use crate::errors::{Result, RuntreeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RuntreeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task, raw.root))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_bodies(cfg)?;
    validate_references(cfg)?;
    validate_root(cfg)?;
    reference_order(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(RuntreeError::Config(
            "task file must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.shutdown_grace_secs == 0 {
        return Err(RuntreeError::Config(
            "[config].shutdown_grace_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_bodies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if name.trim().is_empty() {
            return Err(RuntreeError::Config("task name must not be empty".to_string()));
        }
        if task.usage.trim().is_empty() {
            return Err(RuntreeError::Config(format!(
                "task '{}' must have a non-empty `usage`",
                name
            )));
        }

        match task.body_kinds().as_slice() {
            [_] => {}
            [] => {
                return Err(RuntreeError::Config(format!(
                    "task '{}' needs one of `run`, `serial` or `parallel`",
                    name
                )));
            }
            _ => {
                return Err(RuntreeError::Config(format!(
                    "task '{}' may set only one of `run`, `serial` or `parallel`",
                    name
                )));
            }
        }

        if task.body_kinds() == [BodyKind::Run]
            && task.run.as_ref().is_none_or(|argv| argv.is_empty())
        {
            return Err(RuntreeError::Config(format!(
                "task '{}' has an empty `run` command",
                name
            )));
        }
    }
    Ok(())
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.references() {
            if !cfg.task.contains_key(dep) {
                return Err(RuntreeError::Config(format!(
                    "task '{}' refers to unknown task '{}'",
                    name, dep
                )));
            }
            if dep == name {
                return Err(RuntreeError::Config(format!(
                    "task '{}' cannot refer to itself",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_root(cfg: &RawConfigFile) -> Result<()> {
    let Some(root) = &cfg.root else {
        return Ok(());
    };

    if root.serial.is_some() == root.parallel.is_some() {
        return Err(RuntreeError::Config(
            "[root] needs exactly one of `serial` or `parallel`".to_string(),
        ));
    }

    for name in root.references() {
        if !cfg.task.contains_key(name) {
            return Err(RuntreeError::Config(format!(
                "[root] refers to unknown task '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// Task names ordered so every task comes after the tasks it refers to.
///
/// Fails with [`RuntreeError::Cycle`] if references form a cycle.
pub(crate) fn reference_order(cfg: &RawConfigFile) -> Result<Vec<String>> {
    // Edge direction: referenced -> referencing.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.references() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(RuntreeError::Cycle(format!(
            "task references form a cycle involving '{}'",
            cycle.node_id()
        ))),
    }
}
