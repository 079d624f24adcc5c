// src/engine/mod.rs

//! Dual-mode tree walking.
//!
//! The [`Engine`] is the only entry point that walks a tree. Both walks go
//! through the same `Runnable::run` methods; the [`RunContext`] mode decides
//! at every node whether to record into an [`ExecutionPlan`] or to do the
//! real work, so the plan and the run can never disagree about the static
//! structure.
//!
//! - [`context`]: the per-run execution context.
//! - [`dedup`]: run-wide "already ran" tracking.
//! - [`plan`]: plan steps, the plan itself, and the collect-mode recorder.
//! - [`render`]: text rendering of plans.

pub mod context;
pub mod dedup;
pub mod plan;
pub mod render;

use std::sync::Arc;

use tracing::{debug, info};

use crate::compose::{Runnable, Serial};
use crate::errors::{Result, RuntreeError};
use crate::exec::{CancelToken, Output};

pub use context::{EngineSettings, RunContext};
pub use dedup::{DedupKey, DedupTracker};
pub use plan::{ExecutionPlan, PlanStep, StepKind};
pub use render::{render_task_list, render_tree};

/// Per-invocation parameters for [`Engine::execute`].
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub output: Output,
    /// Invocation directory relative to the root (`""` or `"."` for the root).
    pub cwd: String,
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            output: Output::stdio(),
            cwd: String::new(),
            verbose: false,
        }
    }
}

/// Drives a task tree in collect or execute mode.
#[derive(Debug, Clone)]
pub struct Engine {
    root: Option<Runnable>,
    settings: Arc<EngineSettings>,
}

impl Engine {
    pub fn new(root: impl Into<Runnable>) -> Self {
        Self {
            root: Some(root.into()),
            settings: Arc::new(EngineSettings::default()),
        }
    }

    /// An engine without a tree; plans are empty and execution is a no-op.
    pub fn empty() -> Self {
        Self {
            root: None,
            settings: Arc::new(EngineSettings::default()),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn root(&self) -> Option<&Runnable> {
        self.root.as_ref()
    }

    /// Collect-mode walk. No task body, command or code leaf runs.
    pub async fn plan(&self) -> Result<ExecutionPlan> {
        let Some(root) = &self.root else {
            return Ok(ExecutionPlan::default());
        };

        let recorder = Arc::new(plan::PlanRecorder::new());
        let ctx = RunContext::collect(self.settings.clone(), recorder.clone());
        root.run(&ctx).await?;

        let plan = recorder.finish();
        debug!(tasks = plan.tasks().len(), "plan collected");
        Ok(plan)
    }

    /// Execute-mode walk with a fresh dedup tracker.
    ///
    /// The tree is collected first, so construction errors such as duplicate
    /// task names fail the call before anything runs.
    pub async fn execute(&self, cancel: CancelToken, options: ExecuteOptions) -> Result<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        self.plan().await?;
        self.execute_root(root, cancel, options).await
    }

    async fn execute_root(
        &self,
        root: &Runnable,
        cancel: CancelToken,
        options: ExecuteOptions,
    ) -> Result<()> {
        info!(cwd = %options.cwd, verbose = options.verbose, "executing task tree");
        let ctx = RunContext::execute(
            self.settings.clone(),
            options.output,
            &options.cwd,
            options.verbose,
            cancel,
        );
        root.run(&ctx).await
    }

    /// Execute the named tasks in order, each inside its path mapping, with
    /// one dedup tracker shared across all of them.
    ///
    /// Names are resolved against a fresh plan; an unknown name fails with
    /// [`RuntreeError::TaskNotFound`] before anything runs.
    pub async fn execute_tasks(
        &self,
        names: &[String],
        cancel: CancelToken,
        options: ExecuteOptions,
    ) -> Result<()> {
        let plan = self.plan().await?;
        let targets = names
            .iter()
            .map(|name| {
                plan.runnable_for(name)
                    .ok_or_else(|| RuntreeError::TaskNotFound(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let root = Runnable::from(Serial::new(targets));
        self.execute_root(&root, cancel, options).await
    }
}
