// src/paths/mod.rs

//! Directory scoping for monorepos.
//!
//! - [`filter`]: [`PathFilter`], which runs its body once per resolved
//!   directory, and its builder ([`run_in`]).
//! - [`pattern`]: regex directory patterns for include/exclude lists.
//! - [`skip`]: per-task [`SkipRule`]s.
//! - [`detect`]: marker-file based directory detection.
//! - [`path_utils`]: relative path helpers.

pub mod detect;
pub mod filter;
pub mod path_utils;
pub mod pattern;
pub mod skip;

pub use detect::detect_by_file;
pub use filter::{DetectFn, PathFilter, PathFilterBuilder, run_in};
pub use pattern::Pattern;
pub use skip::SkipRule;
