// src/paths/skip.rs

use crate::errors::Result;
use crate::paths::pattern::{Pattern, compile_all};

/// Per-task exclusion carried by a path filter into its subtree.
///
/// - No patterns: the task is dropped everywhere the filter governs, and is
///   left out of plans and listings.
/// - With patterns: the task stays visible and runs in every directory except
///   those matching one of the patterns.
#[derive(Debug, Clone)]
pub struct SkipRule {
    task: String,
    paths: Vec<Pattern>,
}

impl SkipRule {
    pub fn new<I, S>(task: impl Into<String>, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            task: task.into(),
            paths: compile_all(paths)?,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn paths(&self) -> &[Pattern] {
        &self.paths
    }

    pub fn applies_everywhere(&self) -> bool {
        self.paths.is_empty()
    }

    /// True if this rule skips its task in `dir` (a resolved directory).
    pub fn matches_dir(&self, dir: &str) -> bool {
        self.applies_everywhere() || self.paths.iter().any(|p| p.matches(dir))
    }
}
