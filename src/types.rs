// src/types.rs

//! Small shared types used across the engine.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

/// Boxed, sendable future. Tree walks recurse through `Runnable::run`, so
/// every node returns one of these.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which kind of walk is in progress.
///
/// - `Execute`: the real run; leaves spawn processes and run code.
/// - `Collect`: side-effect-free walk that records an `ExecutionPlan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Execute,
    Collect,
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a declared task value.
///
/// Assigned once when the task is constructed and carried by every clone,
/// so a task referenced from several places in a tree is the same task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Identity of a declared path filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u64);

impl FilterId {
    pub(crate) fn next() -> Self {
        FilterId(NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Directory string used for the repository root in resolved path sets.
pub const ROOT_DIR: &str = ".";

/// Normalise a relative directory to the form used in resolved path sets:
/// forward slashes, no leading `./`, no trailing `/`, and `"."` for the root.
pub fn normalize_dir(dir: &str) -> String {
    let mut s = dir.trim().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    if s.is_empty() || s == "." {
        ROOT_DIR.to_string()
    } else {
        s
    }
}

/// True if `dir` names the repository root (`""` or `"."`).
pub fn is_root_dir(dir: &str) -> bool {
    normalize_dir(dir) == ROOT_DIR
}
