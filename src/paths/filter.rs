// src/paths/filter.rs

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::compose::Runnable;
use crate::engine::RunContext;
use crate::errors::{Result, RuntreeError};
use crate::paths::pattern::{Pattern, compile_all};
use crate::paths::skip::SkipRule;
use crate::types::{FilterId, ROOT_DIR, is_root_dir, normalize_dir};

/// Produces candidate directories, relative to the repository root.
pub type DetectFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

struct FilterConfig {
    detect: Option<DetectFn>,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    skip: Vec<SkipRule>,
}

impl FilterConfig {
    fn is_excluded(&self, dir: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(dir))
    }

    fn is_included(&self, dir: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|p| p.matches(dir))
    }
}

/// Wraps a runnable so it runs once per resolved directory.
///
/// In execute mode the body runs once for every directory in
/// `resolve_for(cwd)`, each time with that directory bound as the current
/// path and this filter's skip rules merged into the context. In collect mode
/// the body is walked once, with the filter recorded as the ambient mapping
/// for the tasks below it.
#[derive(Clone)]
pub struct PathFilter {
    id: FilterId,
    body: Arc<Runnable>,
    config: Arc<FilterConfig>,
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("id", &self.id)
            .field("detect", &self.config.detect.is_some())
            .field("include", &self.config.include)
            .field("exclude", &self.config.exclude)
            .field("skip", &self.config.skip)
            .finish()
    }
}

/// Start building a path filter around `body`.
pub fn run_in(body: impl Into<Runnable>) -> PathFilterBuilder {
    PathFilterBuilder {
        body: body.into(),
        detect: None,
        include: Vec::new(),
        exclude: Vec::new(),
        skip: Vec::new(),
    }
}

impl PathFilter {
    pub fn builder(body: impl Into<Runnable>) -> PathFilterBuilder {
        run_in(body)
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn body(&self) -> &Runnable {
        &self.body
    }

    pub fn skip_rules(&self) -> &[SkipRule] {
        &self.config.skip
    }

    /// Same configuration and identity around a different body.
    pub fn rewrap(&self, body: impl Into<Runnable>) -> PathFilter {
        PathFilter {
            id: self.id,
            body: Arc::new(body.into()),
            config: self.config.clone(),
        }
    }

    /// Sorted, deduplicated set of directories this filter applies to.
    ///
    /// The union of detected directories (kept if they match an include
    /// pattern, or if there are none) and literal include patterns, minus
    /// anything matching an exclude pattern. A filter with neither detection
    /// nor includes applies to the root only.
    pub fn resolve(&self) -> Vec<String> {
        let cfg = &self.config;
        let mut dirs = BTreeSet::new();

        if let Some(detect) = &cfg.detect {
            for dir in detect() {
                let dir = normalize_dir(&dir);
                if cfg.is_included(&dir) && !cfg.is_excluded(&dir) {
                    dirs.insert(dir);
                }
            }
        }

        for pattern in cfg.include.iter().filter(|p| p.is_literal()) {
            let dir = normalize_dir(pattern.as_str());
            if !cfg.is_excluded(&dir) {
                dirs.insert(dir);
            }
        }

        if cfg.detect.is_none() && cfg.include.is_empty() && !cfg.is_excluded(ROOT_DIR) {
            dirs.insert(ROOT_DIR.to_string());
        }

        dirs.into_iter().collect()
    }

    /// `resolve()` scoped to an invocation directory: everything from the
    /// root, otherwise only `cwd` itself (if it resolves).
    pub fn resolve_for(&self, cwd: &str) -> Vec<String> {
        let all = self.resolve();
        if is_root_dir(cwd) {
            return all;
        }
        let cwd = normalize_dir(cwd);
        all.into_iter().filter(|dir| *dir == cwd).collect()
    }

    pub fn runs_in(&self, dir: &str) -> bool {
        let dir = normalize_dir(dir);
        self.resolve().iter().any(|d| *d == dir)
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<()> {
        if ctx.is_collecting() {
            let sub = ctx
                .with_filter(self.clone(), &self.resolve())
                .with_skip_rules(&self.config.skip);
            return self.body.run(&sub).await;
        }

        let dirs = self.resolve_for(ctx.cwd());
        debug!(?dirs, cwd = %ctx.cwd(), "path filter resolved");

        for dir in dirs {
            if ctx.is_cancelled() {
                return Err(RuntreeError::Cancelled);
            }
            let sub = ctx.with_path(&dir).with_skip_rules(&self.config.skip);
            self.body.run(&sub).await?;
        }
        Ok(())
    }
}

pub struct PathFilterBuilder {
    body: Runnable,
    detect: Option<DetectFn>,
    include: Vec<String>,
    exclude: Vec<String>,
    skip: Vec<(String, Vec<String>)>,
}

impl PathFilterBuilder {
    pub fn detect<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.detect = Some(Arc::new(f));
        self
    }

    pub fn detect_with(mut self, f: DetectFn) -> Self {
        self.detect = Some(f);
        self
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Skip `task` in directories matching any of `paths`.
    pub fn skip_task<I, S>(mut self, task: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip
            .push((task.into(), paths.into_iter().map(Into::into).collect()));
        self
    }

    /// Drop `task` entirely under this filter.
    pub fn skip_task_everywhere(mut self, task: impl Into<String>) -> Self {
        self.skip.push((task.into(), Vec::new()));
        self
    }

    pub fn build(self) -> Result<PathFilter> {
        let skip = self
            .skip
            .into_iter()
            .map(|(task, paths)| SkipRule::new(task, paths))
            .collect::<Result<Vec<_>>>()?;

        Ok(PathFilter {
            id: FilterId::next(),
            body: Arc::new(self.body),
            config: Arc::new(FilterConfig {
                detect: self.detect,
                include: compile_all(self.include)?,
                exclude: compile_all(self.exclude)?,
                skip,
            }),
        })
    }
}
