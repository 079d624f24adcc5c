// src/compose/task.rs

//! Named units of work.

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use crate::compose::{Func, Runnable};
use crate::engine::RunContext;
use crate::engine::context::SkipDecision;
use crate::engine::plan::PlanStep;
use crate::errors::{Result, RuntreeError};
use crate::types::{Mode, TaskId};

/// Typed options value a task injects into its subtree.
#[derive(Clone)]
pub struct TaskOptions {
    value_type: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl TaskOptions {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value_type: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn value(&self) -> Arc<dyn Any + Send + Sync> {
        self.value.clone()
    }
}

impl fmt::Debug for TaskOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("type", &self.type_name)
            .finish()
    }
}

struct TaskInner {
    id: TaskId,
    name: String,
    usage: String,
    body: Runnable,
    hidden: bool,
    options: Option<TaskOptions>,
}

/// A named, described unit of work.
///
/// Cheap to clone; every clone shares the identity assigned at construction,
/// which is what deduplication keys on. Derived copies (`renamed`,
/// `hidden_copy`) are new tasks with new identities.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("hidden", &self.inner.hidden)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// # Panics
    ///
    /// If `name` or `usage` is empty. A task without either is a mistake in
    /// the task graph; use [`Task::try_new`] to get an error instead.
    pub fn new(
        name: impl Into<String>,
        usage: impl Into<String>,
        body: impl Into<Runnable>,
    ) -> Self {
        match Self::try_new(name, usage, body) {
            Ok(task) => task,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_new(
        name: impl Into<String>,
        usage: impl Into<String>,
        body: impl Into<Runnable>,
    ) -> Result<Self> {
        Self::builder(name, usage, body).try_build()
    }

    /// Task whose body is an arbitrary-code leaf.
    pub fn from_fn<F, Fut>(name: impl Into<String>, usage: impl Into<String>, f: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(name, usage, Func::new(f))
    }

    pub fn builder(
        name: impl Into<String>,
        usage: impl Into<String>,
        body: impl Into<Runnable>,
    ) -> TaskBuilder {
        TaskBuilder {
            name: name.into(),
            usage: usage.into(),
            body: body.into(),
            hidden: false,
            options: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn usage(&self) -> &str {
        &self.inner.usage
    }

    pub fn body(&self) -> &Runnable {
        &self.inner.body
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.hidden
    }

    pub fn options(&self) -> Option<&TaskOptions> {
        self.inner.options.as_ref()
    }

    /// Copy under a new name, with a new identity.
    ///
    /// # Panics
    ///
    /// If `name` is empty.
    pub fn renamed(&self, name: impl Into<String>) -> Task {
        let mut builder = self.derive();
        builder.name = name.into();
        match builder.try_build() {
            Ok(task) => task,
            Err(err) => panic!("{err}"),
        }
    }

    /// Hidden copy with a new identity: left out of listings, still runnable
    /// by name and as a dependency.
    pub fn hidden_copy(&self) -> Task {
        let mut builder = self.derive();
        builder.hidden = true;
        builder.build_unchecked()
    }

    fn derive(&self) -> TaskBuilder {
        TaskBuilder {
            name: self.inner.name.clone(),
            usage: self.inner.usage.clone(),
            body: self.inner.body.clone(),
            hidden: self.inner.hidden,
            options: self.inner.options.clone(),
        }
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<()> {
        match ctx.mode() {
            Mode::Collect => self.collect(ctx).await,
            Mode::Execute => {
                if !self.admit(ctx) {
                    return Ok(());
                }
                self.execute_admitted(ctx).await
            }
        }
    }

    async fn collect(&self, ctx: &RunContext) -> Result<()> {
        if ctx.skip_decision(self.name()) == SkipDecision::Everywhere {
            debug!(task = %self.name(), "skipped everywhere; left out of plan");
            return Ok(());
        }

        let ctx = self.inject_options(ctx)?;
        let Some(recorder) = ctx.recorder().cloned() else {
            return Ok(());
        };

        recorder.register_task(self, ctx.filter())?;
        let deduped = !ctx.claim(self.id());

        recorder.open(PlanStep::task(self, deduped));
        let res = self.inner.body.run(&ctx).await;
        recorder.close();
        res
    }

    /// Skip-rule and dedup gate for execute mode.
    ///
    /// Skip rules are consulted first so a skipped occurrence never marks the
    /// task as having run.
    pub(crate) fn admit(&self, ctx: &RunContext) -> bool {
        match ctx.skip_decision(self.name()) {
            SkipDecision::Run => {}
            decision => {
                debug!(task = %self.name(), path = %ctx.path(), ?decision, "skip rule matched");
                return false;
            }
        }

        if !ctx.claim(self.id()) {
            debug!(
                task = %self.name(),
                path = %ctx.path(),
                "already ran in this invocation; skipping"
            );
            return false;
        }
        true
    }

    /// Run the task body. Callers must have passed [`Task::admit`].
    pub(crate) async fn execute_admitted(&self, ctx: &RunContext) -> Result<()> {
        if !self.is_hidden() {
            ctx.println(self.header(ctx))?;
        }

        let ctx = self.inject_options(ctx)?;

        info!(task = %self.name(), path = %ctx.path(), "running task");
        let res = self.inner.body.run(&ctx).await;
        if let Err(err) = &res {
            debug!(task = %self.name(), error = %err, "task failed");
        }
        res
    }

    fn inject_options(&self, ctx: &RunContext) -> Result<RunContext> {
        match &self.inner.options {
            Some(options) => ctx.with_options(self.name(), options),
            None => Ok(ctx.clone()),
        }
    }

    fn header(&self, ctx: &RunContext) -> String {
        if ctx.path().is_empty() {
            format!(":: {}", self.name())
        } else {
            format!(":: {} [{}]", self.name(), ctx.path())
        }
    }
}

/// Builder for tasks that need more than name, usage and body.
pub struct TaskBuilder {
    name: String,
    usage: String,
    body: Runnable,
    hidden: bool,
    options: Option<TaskOptions>,
}

impl TaskBuilder {
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Inject `value` into the task's subtree; read back with
    /// `RunContext::options::<T>()`.
    pub fn options<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.options = Some(TaskOptions::new(value));
        self
    }

    /// # Panics
    ///
    /// If the name or usage is empty.
    pub fn build(self) -> Task {
        match self.try_build() {
            Ok(task) => task,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_build(self) -> Result<Task> {
        if self.name.trim().is_empty() {
            return Err(RuntreeError::Config("task name must not be empty".to_string()));
        }
        if self.usage.trim().is_empty() {
            return Err(RuntreeError::Config(format!(
                "task '{}' must have a usage text",
                self.name
            )));
        }
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> Task {
        Task {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                name: self.name,
                usage: self.usage,
                body: self.body,
                hidden: self.hidden,
                options: self.options,
            }),
        }
    }
}
