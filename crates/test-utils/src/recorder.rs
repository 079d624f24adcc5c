use std::sync::{Arc, Mutex};
use std::time::Duration;

use runtree::engine::ExecuteOptions;
use runtree::exec::{Output, SharedBuffer};
use runtree::{RunContext, RuntreeError, Task};

/// Records which task bodies actually ran, in order.
///
/// Every task built through a recorder has a code-leaf body that appends the
/// task name (and the current path, when bound) to a shared log.
#[derive(Clone, Default)]
pub struct Recorder {
    executed: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries so far: `name` at the root, `name@path` inside a path filter.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of times `name` ran, in any directory.
    pub fn count(&self, name: &str) -> usize {
        self.executed()
            .iter()
            .filter(|e| e.as_str() == name || e.starts_with(&format!("{name}@")))
            .count()
    }

    fn record(&self, name: &str, ctx: &RunContext) {
        let entry = if ctx.path().is_empty() {
            name.to_string()
        } else {
            format!("{name}@{}", ctx.path())
        };
        self.executed.lock().unwrap().push(entry);
    }

    /// Task that records itself and succeeds.
    pub fn task(&self, name: &str) -> Task {
        let rec = self.clone();
        let label = name.to_string();
        Task::from_fn(name, format!("{name} task"), move |ctx| {
            let rec = rec.clone();
            let label = label.clone();
            async move {
                rec.record(&label, &ctx);
                Ok::<(), RuntreeError>(())
            }
        })
    }

    /// Task that records itself, prints `line` and succeeds.
    pub fn printing_task(&self, name: &str, line: &str) -> Task {
        let rec = self.clone();
        let label = name.to_string();
        let line = line.to_string();
        Task::from_fn(name, format!("{name} task"), move |ctx| {
            let rec = rec.clone();
            let label = label.clone();
            let line = line.clone();
            async move {
                rec.record(&label, &ctx);
                ctx.println(&line)?;
                Ok::<(), RuntreeError>(())
            }
        })
    }

    /// Task that records itself and fails with `message`.
    pub fn failing_task(&self, name: &str, message: &str) -> Task {
        let rec = self.clone();
        let label = name.to_string();
        let message = message.to_string();
        Task::from_fn(name, format!("{name} task"), move |ctx| {
            let rec = rec.clone();
            let label = label.clone();
            let message = message.clone();
            async move {
                rec.record(&label, &ctx);
                Err::<(), RuntreeError>(anyhow::anyhow!(message).into())
            }
        })
    }

    /// Task that records itself, then waits for `delay` or cancellation.
    /// Cancellation is recorded as `name:cancelled`.
    pub fn slow_task(&self, name: &str, delay: Duration) -> Task {
        let rec = self.clone();
        let label = name.to_string();
        Task::from_fn(name, format!("{name} task"), move |ctx| {
            let rec = rec.clone();
            let label = label.clone();
            async move {
                rec.record(&label, &ctx);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(()),
                    _ = ctx.cancelled() => {
                        rec.executed.lock().unwrap().push(format!("{label}:cancelled"));
                        Err(RuntreeError::Cancelled)
                    }
                }
            }
        })
    }
}

/// Execute options writing into a fresh in-memory buffer.
pub fn captured_options() -> (ExecuteOptions, SharedBuffer) {
    let (output, buffer) = Output::buffered();
    let options = ExecuteOptions {
        output,
        ..ExecuteOptions::default()
    };
    (options, buffer)
}

/// Like [`captured_options`], invoked from `cwd`.
pub fn captured_options_in(cwd: &str) -> (ExecuteOptions, SharedBuffer) {
    let (mut options, buffer) = captured_options();
    options.cwd = cwd.to_string();
    (options, buffer)
}
