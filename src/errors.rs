// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntreeError {
    /// A mistake in the task graph itself (duplicate names, options
    /// shadowing, malformed task file). Never a runtime condition.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    Cycle(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<regex::Error> for RuntreeError {
    fn from(err: regex::Error) -> Self {
        RuntreeError::Pattern(err.to_string())
    }
}

impl From<globset::Error> for RuntreeError {
    fn from(err: globset::Error) -> Self {
        RuntreeError::Pattern(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RuntreeError>;
