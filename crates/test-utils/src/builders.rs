#![allow(dead_code)]

use std::collections::BTreeMap;

use runtree::config::{
    ConfigFile, ConfigSection, PathsConfig, RawConfigFile, RootSection, TaskConfig,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
                root: None,
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_root_serial(mut self, names: &[&str]) -> Self {
        self.config.root = Some(RootSection {
            serial: Some(names.iter().map(|s| s.to_string()).collect()),
            parallel: None,
        });
        self
    }

    pub fn with_root_parallel(mut self, names: &[&str]) -> Self {
        self.config.root = Some(RootSection {
            serial: None,
            parallel: Some(names.iter().map(|s| s.to_string()).collect()),
        });
        self
    }

    pub fn with_shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.config.config.shutdown_grace_secs = secs;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// Task running `argv`.
    pub fn run(usage: &str, argv: &[&str]) -> Self {
        Self::with_usage(usage).argv(argv)
    }

    /// Task running the named tasks one after another.
    pub fn serial(usage: &str, names: &[&str]) -> Self {
        let mut b = Self::with_usage(usage);
        b.task.serial = Some(names.iter().map(|s| s.to_string()).collect());
        b
    }

    /// Task running the named tasks concurrently.
    pub fn parallel(usage: &str, names: &[&str]) -> Self {
        let mut b = Self::with_usage(usage);
        b.task.parallel = Some(names.iter().map(|s| s.to_string()).collect());
        b
    }

    pub fn with_usage(usage: &str) -> Self {
        Self {
            task: TaskConfig {
                usage: usage.to_string(),
                ..TaskConfig::default()
            },
        }
    }

    pub fn argv(mut self, argv: &[&str]) -> Self {
        self.task.run = Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.task.hidden = true;
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.paths().include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.paths().exclude.push(pattern.to_string());
        self
    }

    pub fn detect(mut self, file_glob: &str) -> Self {
        self.paths().detect.push(file_glob.to_string());
        self
    }

    pub fn skip(mut self, task: &str, dirs: &[&str]) -> Self {
        self.paths()
            .skip
            .insert(task.to_string(), dirs.iter().map(|s| s.to_string()).collect());
        self
    }

    fn paths(&mut self) -> &mut PathsConfig {
        self.task.paths.get_or_insert_with(PathsConfig::default)
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
