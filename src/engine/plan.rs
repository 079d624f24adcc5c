// src/engine/plan.rs

//! Execution plans produced by collect-mode walks.
//!
//! A plan is built once per `Engine::plan` call and is the single source for
//! every consumer that needs to know the shape of the tree: help/listing,
//! JSON export, path mappings and shim placement. Consumers must never
//! re-walk the tree on their own.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use serde::Serialize;

use crate::compose::{Runnable, Task};
use crate::errors::{Result, RuntreeError};
use crate::paths::PathFilter;
use crate::types::{ROOT_DIR, TaskId, is_root_dir, normalize_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Task,
    Serial,
    Parallel,
}

/// One node of the plan tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    /// This occurrence would be skipped because the same task already ran
    /// earlier in the walk.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deduped: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PlanStep>,
}

impl PlanStep {
    pub(crate) fn task(task: &Task, deduped: bool) -> Self {
        Self {
            kind: StepKind::Task,
            name: Some(task.name().to_string()),
            usage: Some(task.usage().to_string()),
            hidden: task.is_hidden(),
            deduped,
            children: Vec::new(),
        }
    }

    pub(crate) fn group(kind: StepKind) -> Self {
        Self {
            kind,
            name: None,
            usage: None,
            hidden: false,
            deduped: false,
            children: Vec::new(),
        }
    }

    /// Depth-first iterator over this step and all its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &PlanStep> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let step = stack.pop()?;
            stack.extend(step.children.iter().rev());
            Some(step)
        })
    }
}

/// Result of a collect-mode walk.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    steps: Vec<PlanStep>,
    tasks: Vec<Task>,
    path_mappings: BTreeMap<String, PathFilter>,
}

#[derive(Serialize)]
struct PlanExport<'a> {
    steps: &'a [PlanStep],
    paths: BTreeMap<String, Vec<String>>,
}

impl ExecutionPlan {
    /// Top-level steps (one for a non-empty tree).
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every distinct task seen by the walk, hidden ones included, in first
    /// occurrence order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn find_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Task name -> nearest enclosing path filter.
    pub fn path_mappings(&self) -> &BTreeMap<String, PathFilter> {
        &self.path_mappings
    }

    /// Task name -> resolved directories, for every mapped task.
    pub fn resolved_paths(&self) -> BTreeMap<String, Vec<String>> {
        self.path_mappings
            .iter()
            .map(|(name, filter)| (name.clone(), filter.resolve()))
            .collect()
    }

    /// Every directory any path filter resolves to, plus the root; sorted.
    pub fn shim_dirs(&self) -> Vec<String> {
        let mut dirs: BTreeSet<String> = BTreeSet::new();
        dirs.insert(ROOT_DIR.to_string());
        for filter in self.path_mappings.values() {
            dirs.extend(filter.resolve());
        }
        dirs.into_iter().collect()
    }

    /// Tasks that should be listed for an invocation from `cwd`.
    ///
    /// Hidden tasks are never listed. Mapped tasks are listed where their
    /// filter resolves for `cwd`; unmapped tasks only at the root.
    pub fn visible_tasks(&self, cwd: &str) -> Vec<&Task> {
        let at_root = is_root_dir(cwd);
        let cwd = normalize_dir(cwd);
        self.tasks
            .iter()
            .filter(|t| !t.is_hidden())
            .filter(|t| match self.path_mappings.get(t.name()) {
                Some(filter) => !filter.resolve_for(&cwd).is_empty(),
                None => at_root,
            })
            .collect()
    }

    /// The runnable to execute when `name` is invoked on its own: the task
    /// wrapped in its path mapping, if it has one.
    pub fn runnable_for(&self, name: &str) -> Option<Runnable> {
        let task = self.find_task(name)?;
        Some(match self.path_mappings.get(name) {
            Some(filter) => Runnable::from(filter.rewrap(Runnable::from(task))),
            None => Runnable::from(task),
        })
    }

    /// JSON export: step tree plus `name -> resolved paths`.
    pub fn to_json(&self) -> Result<String> {
        let export = PlanExport {
            steps: &self.steps,
            paths: self.resolved_paths(),
        };
        serde_json::to_string_pretty(&export).map_err(|e| RuntreeError::Other(e.into()))
    }
}

#[derive(Default)]
struct RecorderState {
    roots: Vec<PlanStep>,
    open: Vec<PlanStep>,
    tasks: Vec<Task>,
    names: HashMap<String, TaskId>,
    path_mappings: BTreeMap<String, PathFilter>,
}

impl RecorderState {
    fn close_top(&mut self) {
        if let Some(step) = self.open.pop() {
            match self.open.last_mut() {
                Some(parent) => parent.children.push(step),
                None => self.roots.push(step),
            }
        }
    }
}

/// Collects plan steps during a collect walk.
///
/// Collect walks are sequential (parallel groups recurse one child at a time
/// in collect mode), so a simple stack of open steps is enough.
#[derive(Default)]
pub(crate) struct PlanRecorder {
    state: Mutex<RecorderState>,
}

impl PlanRecorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a task occurrence. Fails if a different task already uses the
    /// same name.
    pub(crate) fn register_task(&self, task: &Task, filter: Option<&PathFilter>) -> Result<()> {
        let mut state = self.lock();

        let existing = state.names.get(task.name()).copied();
        match existing {
            Some(id) if id != task.id() => {
                return Err(RuntreeError::Config(format!(
                    "duplicate task name '{}'",
                    task.name()
                )));
            }
            Some(_) => {}
            None => {
                state.names.insert(task.name().to_string(), task.id());
                state.tasks.push(task.clone());
            }
        }

        if let Some(filter) = filter {
            state
                .path_mappings
                .entry(task.name().to_string())
                .or_insert_with(|| filter.clone());
        }
        Ok(())
    }

    /// Start a step; following steps nest under it until `close`.
    pub(crate) fn open(&self, step: PlanStep) {
        self.lock().open.push(step);
    }

    pub(crate) fn close(&self) {
        self.lock().close_top();
    }

    pub(crate) fn finish(&self) -> ExecutionPlan {
        let mut state = self.lock();
        // A failed walk can leave steps open; fold them in so the partial
        // shape is still visible.
        while !state.open.is_empty() {
            state.close_top();
        }
        let state = std::mem::take(&mut *state);
        ExecutionPlan {
            steps: state.roots,
            tasks: state.tasks,
            path_mappings: state.path_mappings,
        }
    }
}
