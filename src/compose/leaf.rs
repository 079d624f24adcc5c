// src/compose/leaf.rs

//! Leaves: static commands and arbitrary code. Both are inert in collect
//! mode, which is what keeps planning free of side effects.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::engine::RunContext;
use crate::errors::Result;
use crate::exec::run_command;
use crate::types::BoxFuture;

/// External process with static arguments, run in the current path.
#[derive(Clone)]
pub struct Cmd {
    program: String,
    args: Arc<[String]>,
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd")
            .field("program", &self.program)
            .field("args", &self.args)
            .finish()
    }
}

impl Cmd {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) async fn run(&self, ctx: &RunContext) -> Result<()> {
        if ctx.is_collecting() {
            return Ok(());
        }
        run_command(ctx, &self.program, &self.args).await
    }
}

type FuncBody = dyn Fn(RunContext) -> BoxFuture<'static, Result<()>> + Send + Sync;

/// Arbitrary async code. Any composition it performs at runtime is
/// invisible to plans, since collect walks never call it.
#[derive(Clone)]
pub struct Func {
    f: Arc<FuncBody>,
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Func")
    }
}

impl Func {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |ctx| -> BoxFuture<'static, Result<()>> { Box::pin(f(ctx)) }),
        }
    }

    pub(crate) fn run(&self, ctx: &RunContext) -> BoxFuture<'static, Result<()>> {
        if ctx.is_collecting() {
            return Box::pin(async { Ok(()) });
        }
        (self.f)(ctx.clone())
    }
}
