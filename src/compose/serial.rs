// src/compose/serial.rs

use std::sync::Arc;

use crate::compose::Runnable;
use crate::engine::RunContext;
use crate::engine::plan::{PlanStep, StepKind};
use crate::errors::{Result, RuntreeError};

/// Ordered composition: children run one at a time in declaration order.
///
/// A task child that already ran in this invocation is skipped silently. The
/// first error stops the walk and is returned unchanged.
#[derive(Clone, Default)]
pub struct Serial {
    items: Arc<[Runnable]>,
}

impl Serial {
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
            let recorder = ctx.recorder().cloned();
            if let Some(recorder) = &recorder {
                recorder.open(PlanStep::group(StepKind::Serial));
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
            return res;
        }

        for item in self.items.iter() {
            if ctx.is_cancelled() {
                return Err(RuntreeError::Cancelled);
            }
            item.run(ctx).await?;
        }
        Ok(())
    }
}
