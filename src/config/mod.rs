// src/config/mod.rs

//! `runtree.toml` task files.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading and parsing.
//! - `validate.rs`: usage/body/reference checks and cycle detection.
//! - `build.rs`: turning a validated file into an [`Engine`](crate::engine::Engine).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{build_engine, settings_from_config};
pub use loader::{
    DEFAULT_CONFIG_FILE, config_root_dir, load_and_validate, load_from_fs, load_from_path,
    parse_config,
};
pub use model::{ConfigFile, ConfigSection, PathsConfig, RawConfigFile, RootSection, TaskConfig};
