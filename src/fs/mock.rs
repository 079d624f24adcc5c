// src/fs/mock.rs

//! In-memory [`FileSystem`] for exercising detection and task-file loading
//! without touching disk.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone)]
enum Node {
    File(String),
    /// Child names, sorted.
    Dir(BTreeSet<String>),
}

/// Paths are compared after dropping `.` components, so `./a/b` and `a/b`
/// name the same entry and `""` is the root. Listings keep the caller's
/// spelling of the directory they list.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    nodes: Arc<Mutex<HashMap<PathBuf, Node>>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(PathBuf::new(), Node::Dir(BTreeSet::new()));
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add (or replace) a file, creating missing parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let key = clean(path.as_ref());
        let mut nodes = self.lock();
        if let Some(parent) = key.parent() {
            ensure_dir(&mut nodes, parent);
            link(&mut nodes, &key);
        }
        nodes.insert(key, Node::File(contents.into()));
    }

    /// Add an empty directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let key = clean(path.as_ref());
        ensure_dir(&mut self.lock(), &key);
    }

    fn node(&self, path: &Path) -> Option<Node> {
        self.lock().get(&clean(path)).cloned()
    }
}

fn clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn ensure_dir(nodes: &mut HashMap<PathBuf, Node>, dir: &Path) {
    if nodes.contains_key(dir) {
        return;
    }
    nodes.insert(dir.to_path_buf(), Node::Dir(BTreeSet::new()));
    if let Some(parent) = dir.parent() {
        ensure_dir(nodes, parent);
        link(nodes, dir);
    }
}

/// Record `path` as a child of its parent directory.
fn link(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return;
    };
    if let Some(Node::Dir(children)) = nodes.get_mut(parent) {
        children.insert(name.to_string_lossy().into_owned());
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.node(path) {
            Some(Node::File(contents)) => Ok(contents),
            Some(Node::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.node(path) {
            Some(Node::Dir(children)) => Ok(children.iter().map(|name| path.join(name)).collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
