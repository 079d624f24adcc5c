// src/compose/mod.rs

//! Task composition.
//!
//! [`Runnable`] is a closed sum type over every node kind a tree can hold.
//! Walking code matches on it exhaustively, so adding a node kind is a
//! visible change everywhere the tree is walked rather than an open
//! extension point that could ignore the collect/execute contract.
//!
//! - [`task`]: named, described units of work.
//! - [`serial`] / [`parallel`]: composition operators.
//! - [`leaf`]: static command and arbitrary-code leaves.

pub mod leaf;
pub mod parallel;
pub mod serial;
pub mod task;

use std::fmt;
use std::future::Future;

use crate::engine::RunContext;
use crate::errors::Result;
use crate::paths::PathFilter;
use crate::types::BoxFuture;

pub use leaf::{Cmd, Func};
pub use parallel::Parallel;
pub use serial::Serial;
pub use task::{Task, TaskBuilder, TaskOptions};

/// Anything that can be walked in collect or execute mode.
#[derive(Clone)]
pub enum Runnable {
    Task(Task),
    Serial(Serial),
    Parallel(Parallel),
    Paths(PathFilter),
    Cmd(Cmd),
    Func(Func),
}

impl Runnable {
    /// Walk this node in the context's mode.
    pub fn run<'a>(&'a self, ctx: &'a RunContext) -> BoxFuture<'a, Result<()>> {
        match self {
            Runnable::Task(task) => Box::pin(task.run(ctx)),
            Runnable::Serial(serial) => Box::pin(serial.run(ctx)),
            Runnable::Parallel(parallel) => Box::pin(parallel.run(ctx)),
            Runnable::Paths(filter) => Box::pin(filter.run(ctx)),
            Runnable::Cmd(cmd) => Box::pin(cmd.run(ctx)),
            Runnable::Func(func) => func.run(ctx),
        }
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runnable::Task(task) => f.debug_tuple("Task").field(&task.name()).finish(),
            Runnable::Serial(serial) => f.debug_tuple("Serial").field(&serial.items()).finish(),
            Runnable::Parallel(parallel) => {
                f.debug_tuple("Parallel").field(&parallel.items()).finish()
            }
            Runnable::Paths(filter) => f.debug_tuple("Paths").field(filter).finish(),
            Runnable::Cmd(cmd) => f.debug_tuple("Cmd").field(cmd).finish(),
            Runnable::Func(_) => f.write_str("Func"),
        }
    }
}

impl From<Task> for Runnable {
    fn from(task: Task) -> Self {
        Runnable::Task(task)
    }
}

impl From<&Task> for Runnable {
    fn from(task: &Task) -> Self {
        Runnable::Task(task.clone())
    }
}

impl From<Serial> for Runnable {
    fn from(serial: Serial) -> Self {
        Runnable::Serial(serial)
    }
}

impl From<Parallel> for Runnable {
    fn from(parallel: Parallel) -> Self {
        Runnable::Parallel(parallel)
    }
}

impl From<PathFilter> for Runnable {
    fn from(filter: PathFilter) -> Self {
        Runnable::Paths(filter)
    }
}

impl From<&PathFilter> for Runnable {
    fn from(filter: &PathFilter) -> Self {
        Runnable::Paths(filter.clone())
    }
}

impl From<Cmd> for Runnable {
    fn from(cmd: Cmd) -> Self {
        Runnable::Cmd(cmd)
    }
}

impl From<Func> for Runnable {
    fn from(func: Func) -> Self {
        Runnable::Func(func)
    }
}

/// Run `items` one after another; stop at the first error.
pub fn serial<I, R>(items: I) -> Runnable
where
    I: IntoIterator<Item = R>,
    R: Into<Runnable>,
{
    Runnable::Serial(Serial::new(items))
}

/// Run `items` concurrently; cancel the rest on the first error.
pub fn parallel<I, R>(items: I) -> Runnable
where
    I: IntoIterator<Item = R>,
    R: Into<Runnable>,
{
    Runnable::Parallel(Parallel::new(items))
}

/// Static external command leaf.
pub fn cmd<I, S>(program: impl Into<String>, args: I) -> Runnable
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Runnable::Cmd(Cmd::new(program, args))
}

/// Arbitrary-code leaf. Never invoked by collect walks.
pub fn func<F, Fut>(f: F) -> Runnable
where
    F: Fn(RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Runnable::Func(Func::new(f))
}

/// `serial![a, b, c]` converts each item with `Runnable::from`.
#[macro_export]
macro_rules! serial {
    ($($item:expr),* $(,)?) => {
        $crate::compose::serial(::std::vec![$($crate::compose::Runnable::from($item)),*])
    };
}

/// `parallel![a, b, c]` converts each item with `Runnable::from`.
#[macro_export]
macro_rules! parallel {
    ($($item:expr),* $(,)?) => {
        $crate::compose::parallel(::std::vec![$($crate::compose::Runnable::from($item)),*])
    };
}
