// src/engine/context.rs

//! Per-run execution context.
//!
//! A [`RunContext`] is created once per top-level `plan`/`execute` call and
//! handed by reference to every node of the tree. Nodes that need to change
//! something for their subtree (parallel branches swap the output sink, path
//! filters bind a directory and merge skip rules, tasks inject options) derive
//! a shallow copy with that one field replaced; a context is never mutated in
//! place.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::compose::task::TaskOptions;
use crate::engine::dedup::{DedupKey, DedupTracker};
use crate::engine::plan::PlanRecorder;
use crate::errors::{Result, RuntreeError};
use crate::exec::{CancelToken, Output};
use crate::paths::{PathFilter, SkipRule};
use crate::types::{Mode, TaskId, normalize_dir};

/// Engine-wide settings shared by every context of a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Repository root; resolved paths are relative to it.
    pub root_dir: PathBuf,
    /// Managed tool binaries, relative to `root_dir` unless absolute.
    /// Prepended to `PATH` for every spawned process.
    pub tool_dir: PathBuf,
    /// How long a cancelled process gets between interrupt and kill.
    pub shutdown_grace: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            tool_dir: PathBuf::from(".runtree/bin"),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
struct InjectedOptions {
    task: String,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Outcome of consulting the accumulated skip rules for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipDecision {
    Run,
    /// A rule without path patterns: hidden from plans, never runs.
    Everywhere,
    /// A path-specific rule matched the current directory.
    Here,
}

#[derive(Clone)]
pub struct RunContext {
    mode: Mode,
    output: Output,
    /// Current resolved path; empty means the repository root.
    path: String,
    /// Directory the invocation came from, relative to the root.
    cwd: String,
    verbose: bool,
    settings: Arc<EngineSettings>,
    dedup: Arc<DedupTracker>,
    skip_rules: Arc<Vec<SkipRule>>,
    options: Arc<HashMap<TypeId, InjectedOptions>>,
    cancel: CancelToken,
    recorder: Option<Arc<PlanRecorder>>,
    filter: Option<PathFilter>,
    /// Collect mode: directories the enclosing filter resolves to.
    planned_paths: Arc<Vec<String>>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("mode", &self.mode)
            .field("path", &self.path)
            .field("cwd", &self.cwd)
            .field("verbose", &self.verbose)
            .field("skip_rules", &self.skip_rules.len())
            .finish_non_exhaustive()
    }
}

impl RunContext {
    pub(crate) fn collect(settings: Arc<EngineSettings>, recorder: Arc<PlanRecorder>) -> Self {
        Self {
            mode: Mode::Collect,
            output: Output::discard(),
            path: String::new(),
            cwd: String::new(),
            verbose: false,
            settings,
            dedup: Arc::new(DedupTracker::new()),
            skip_rules: Arc::new(Vec::new()),
            options: Arc::new(HashMap::new()),
            cancel: CancelToken::new(),
            recorder: Some(recorder),
            filter: None,
            planned_paths: Arc::new(vec![String::new()]),
        }
    }

    pub(crate) fn execute(
        settings: Arc<EngineSettings>,
        output: Output,
        cwd: &str,
        verbose: bool,
        cancel: CancelToken,
    ) -> Self {
        Self {
            mode: Mode::Execute,
            output,
            path: String::new(),
            cwd: root_as_empty(cwd),
            verbose,
            settings,
            dedup: Arc::new(DedupTracker::new()),
            skip_rules: Arc::new(Vec::new()),
            options: Arc::new(HashMap::new()),
            cancel,
            recorder: None,
            filter: None,
            planned_paths: Arc::new(vec![String::new()]),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_collecting(&self) -> bool {
        self.mode == Mode::Collect
    }

    /// Current resolved path relative to the root; empty at the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Invocation directory relative to the root; empty at the root.
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when this context's run (or enclosing parallel group) is
    /// cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.settings.root_dir
    }

    /// Absolute-or-root-relative directory commands run in.
    pub fn working_dir(&self) -> PathBuf {
        if self.path.is_empty() {
            self.settings.root_dir.clone()
        } else {
            self.settings.root_dir.join(&self.path)
        }
    }

    /// Absolute tool directory; it is put on `PATH` for processes whose
    /// working directory differs from ours.
    pub fn tool_dir(&self) -> PathBuf {
        let dir = self.settings.root_dir.join(&self.settings.tool_dir);
        if dir.is_absolute() {
            return dir;
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => dir,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.settings.shutdown_grace
    }

    /// Options value injected by the nearest enclosing task, if it declared
    /// one of type `T`.
    pub fn options<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.options
            .get(&TypeId::of::<T>())
            .and_then(|o| o.value.downcast_ref::<T>())
    }

    pub fn print(&self, text: impl AsRef<str>) -> Result<()> {
        if self.is_collecting() {
            return Ok(());
        }
        self.output.write_stdout(text.as_ref().as_bytes())?;
        Ok(())
    }

    pub fn println(&self, text: impl AsRef<str>) -> Result<()> {
        if self.is_collecting() {
            return Ok(());
        }
        let mut line = text.as_ref().to_string();
        line.push('\n');
        self.output.write_stdout(line.as_bytes())?;
        Ok(())
    }

    pub fn eprintln(&self, text: impl AsRef<str>) -> Result<()> {
        if self.is_collecting() {
            return Ok(());
        }
        let mut line = text.as_ref().to_string();
        line.push('\n');
        self.output.write_stderr(line.as_bytes())?;
        Ok(())
    }

    /// Run an external command in the current path.
    pub async fn exec<S: AsRef<str>>(&self, program: &str, args: &[S]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        crate::exec::run_command(self, program, &args).await
    }

    pub(crate) fn recorder(&self) -> Option<&Arc<PlanRecorder>> {
        self.recorder.as_ref()
    }

    pub(crate) fn filter(&self) -> Option<&PathFilter> {
        self.filter.as_ref()
    }

    /// Mark `task` as run here. Returns `false` if it already ran.
    ///
    /// Execute walks claim the bound path. Collect walks claim every
    /// directory the enclosing filter resolves to and report the occurrence
    /// as run if any of them is new, which is when execution would still run
    /// its body somewhere.
    pub(crate) fn claim(&self, task: TaskId) -> bool {
        match self.mode {
            Mode::Execute => self.dedup.claim(DedupKey {
                task,
                path: self.path.clone(),
            }),
            Mode::Collect => {
                if self.planned_paths.is_empty() {
                    return true;
                }
                self.dedup.claim_any(self.planned_paths.iter().map(|path| DedupKey {
                    task,
                    path: path.clone(),
                }))
            }
        }
    }

    pub(crate) fn skip_decision(&self, task: &str) -> SkipDecision {
        let dir = normalize_dir(&self.path);
        let mut decision = SkipDecision::Run;
        for rule in self.skip_rules.iter().filter(|r| r.task() == task) {
            if rule.applies_everywhere() {
                return SkipDecision::Everywhere;
            }
            if self.mode == Mode::Execute && rule.matches_dir(&dir) {
                decision = SkipDecision::Here;
            }
        }
        decision
    }

    pub(crate) fn with_output(&self, output: Output) -> Self {
        Self {
            output,
            ..self.clone()
        }
    }

    pub(crate) fn with_cancel(&self, cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub(crate) fn with_path(&self, dir: &str) -> Self {
        Self {
            path: root_as_empty(dir),
            ..self.clone()
        }
    }

    /// Collect mode: enter `filter`, which resolves to `dirs`.
    pub(crate) fn with_filter(&self, filter: PathFilter, dirs: &[String]) -> Self {
        Self {
            filter: Some(filter),
            planned_paths: Arc::new(dirs.iter().map(|d| root_as_empty(d)).collect()),
            ..self.clone()
        }
    }

    pub(crate) fn with_skip_rules(&self, extra: &[SkipRule]) -> Self {
        if extra.is_empty() {
            return self.clone();
        }
        let mut rules = (*self.skip_rules).clone();
        rules.extend(extra.iter().cloned());
        Self {
            skip_rules: Arc::new(rules),
            ..self.clone()
        }
    }

    /// Derive a context carrying `options` for the subtree of task `task`.
    ///
    /// Fails if an enclosing task already injected a value of the same type,
    /// since the inner value would silently shadow it.
    pub(crate) fn with_options(&self, task: &str, options: &TaskOptions) -> Result<Self> {
        if let Some(existing) = self.options.get(&options.value_type()) {
            return Err(RuntreeError::Config(format!(
                "task '{}' injects options of type {} already injected by enclosing task '{}'",
                task, existing.type_name, existing.task
            )));
        }

        let mut map = (*self.options).clone();
        map.insert(
            options.value_type(),
            InjectedOptions {
                task: task.to_string(),
                type_name: options.type_name(),
                value: options.value(),
            },
        );
        Ok(Self {
            options: Arc::new(map),
            ..self.clone()
        })
    }
}

fn root_as_empty(dir: &str) -> String {
    let dir = normalize_dir(dir);
    if dir == crate::types::ROOT_DIR {
        String::new()
    } else {
        dir
    }
}
