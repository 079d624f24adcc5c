// src/compose/parallel.rs

use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::compose::{Runnable, Task};
use crate::engine::RunContext;
use crate::engine::plan::{PlanStep, StepKind};
use crate::errors::{Result, RuntreeError};
use crate::exec::Output;

/// Concurrent composition.
///
/// Execution:
/// 1. Task children that are skipped or already ran are dropped up front.
/// 2. No survivors is a no-op; a single survivor runs inline with the
///    caller's output, exactly as in a serial group.
/// 3. Otherwise each survivor runs on its own Tokio task with a private
///    output buffer and a child cancel token shared by the group.
/// 4. The first failure cancels the group's token; every branch is still
///    awaited, and the first error is returned.
/// 5. A branch's buffer is flushed to the caller's output, under a lock
///    shared by the siblings, as soon as that branch finishes. Output is
///    never interleaved between branches and appears in completion order.
#[derive(Clone, Default)]
pub struct Parallel {
    items: Arc<[Runnable]>,
}

enum Branch {
    /// Task that already passed the skip/dedup gate.
    Admitted(Task),
    Item(Runnable),
}

impl Branch {
    async fn run(&self, ctx: &RunContext) -> Result<()> {
        match self {
            Branch::Admitted(task) => task.execute_admitted(ctx).await,
            Branch::Item(item) => item.run(ctx).await,
        }
    }
}

impl Parallel {
    pub fn new<I, R>(items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Runnable>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn items(&self) -> &[Runnable] {
        &self.items
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<()> {
        if ctx.is_collecting() {
            return self.collect(ctx).await;
        }

        let survivors: Vec<Branch> = self
            .items
            .iter()
            .filter_map(|item| match item {
                Runnable::Task(task) => task.admit(ctx).then(|| Branch::Admitted(task.clone())),
                other => Some(Branch::Item(other.clone())),
            })
            .collect();

        debug!(
            survivors = survivors.len(),
            declared = self.items.len(),
            path = %ctx.path(),
            "parallel group"
        );

        match survivors.len() {
            0 => Ok(()),
            1 => survivors[0].run(ctx).await,
            _ => run_branches(survivors, ctx).await,
        }
    }

    async fn collect(&self, ctx: &RunContext) -> Result<()> {
        let recorder = ctx.recorder().cloned();
        if let Some(recorder) = &recorder {
            recorder.open(PlanStep::group(StepKind::Parallel));
        }
        let mut res = Ok(());
        for item in self.items.iter() {
            res = item.run(ctx).await;
            if res.is_err() {
                break;
            }
        }
        if let Some(recorder) = &recorder {
            recorder.close();
        }
        res
    }
}

async fn run_branches(branches: Vec<Branch>, ctx: &RunContext) -> Result<()> {
    let group_cancel = ctx.cancel_token().child();
    let flush_lock = Arc::new(Mutex::new(()));
    let mut set = JoinSet::new();

    for branch in branches {
        let (output, buffer) = Output::buffered();
        let branch_ctx = ctx.with_output(output).with_cancel(group_cancel.clone());
        let parent = ctx.output().clone();
        let cancel = group_cancel.clone();
        let flush_lock = flush_lock.clone();

        set.spawn(async move {
            let res = branch.run(&branch_ctx).await;
            if res.is_err() {
                cancel.cancel();
            }

            let bytes = buffer.take();
            if !bytes.is_empty() {
                let _guard = flush_lock.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = parent.write_stdout(&bytes) {
                    warn!(error = %e, "failed to flush parallel branch output");
                }
            }
            res
        });
    }

    let mut first_err = None;
    while let Some(joined) = set.join_next().await {
        let res = joined.unwrap_or_else(|e| {
            Err(RuntreeError::Other(anyhow::anyhow!(
                "parallel branch panicked: {e}"
            )))
        });

        if let Err(err) = res {
            group_cancel.cancel();
            match first_err {
                None => first_err = Some(err),
                Some(_) => debug!(error = %err, "additional parallel branch failure"),
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
