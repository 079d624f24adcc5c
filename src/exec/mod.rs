// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] runs external processes for command leaves and
//!   `RunContext::exec`, with PATH management and graceful shutdown.
//! - [`cancel`] provides the hierarchical [`CancelToken`] threaded through
//!   every execution context.
//! - [`output`] holds the [`Output`] sinks and the per-branch
//!   [`SharedBuffer`] used by parallel groups.

pub mod cancel;
pub mod command;
pub mod output;

pub use cancel::CancelToken;
pub use command::run_command;
pub use output::{Output, SharedBuffer};
