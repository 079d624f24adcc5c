// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Task file exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// tool_dir = ".runtree/bin"
/// shutdown_grace_secs = 5
///
/// [task.fmt]
/// usage = "format sources"
/// run = ["cargo", "fmt"]
///
/// [task.check]
/// usage = "lint and test"
/// parallel = ["lint", "test"]
///
/// [root]
/// serial = ["fmt", "check"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are task names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    #[serde(default)]
    pub root: Option<RootSection>,
}

/// A validated task file. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub root: Option<RootSection>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
        root: Option<RootSection>,
    ) -> Self {
        Self { config, task, root }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Managed tool binaries, relative to the task file's directory.
    #[serde(default = "default_tool_dir")]
    pub tool_dir: String,

    /// Seconds between interrupting a cancelled process and killing it.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_tool_dir() -> String {
    ".runtree/bin".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            tool_dir: default_tool_dir(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

/// `[task.<name>]` section. Exactly one of `run`, `serial`, `parallel`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub usage: String,

    /// Command argv: program followed by its arguments.
    #[serde(default)]
    pub run: Option<Vec<String>>,

    /// Names of tasks to run one after another.
    #[serde(default)]
    pub serial: Option<Vec<String>>,

    /// Names of tasks to run concurrently.
    #[serde(default)]
    pub parallel: Option<Vec<String>>,

    #[serde(default)]
    pub hidden: bool,

    /// Run the task once per resolved directory.
    #[serde(default)]
    pub paths: Option<PathsConfig>,
}

/// Which part of a task body is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Run,
    Serial,
    Parallel,
}

impl TaskConfig {
    /// Every body key that is present.
    pub fn body_kinds(&self) -> Vec<BodyKind> {
        let mut kinds = Vec::new();
        if self.run.is_some() {
            kinds.push(BodyKind::Run);
        }
        if self.serial.is_some() {
            kinds.push(BodyKind::Serial);
        }
        if self.parallel.is_some() {
            kinds.push(BodyKind::Parallel);
        }
        kinds
    }

    /// Task names this task's body refers to.
    pub fn references(&self) -> impl Iterator<Item = &String> {
        self.serial
            .iter()
            .chain(self.parallel.iter())
            .flat_map(|names| names.iter())
    }
}

/// `paths = { ... }` table of a task.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// File-name globs; a directory containing a matching file is a
    /// candidate.
    #[serde(default)]
    pub detect: Vec<String>,

    /// Task name -> directory patterns where it is skipped. An empty list
    /// skips the task everywhere below this filter.
    #[serde(default)]
    pub skip: BTreeMap<String, Vec<String>>,
}

/// `[root]` section. Exactly one of `serial` or `parallel`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RootSection {
    #[serde(default)]
    pub serial: Option<Vec<String>>,

    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}

impl RootSection {
    pub fn references(&self) -> impl Iterator<Item = &String> {
        self.serial
            .iter()
            .chain(self.parallel.iter())
            .flat_map(|names| names.iter())
    }
}
