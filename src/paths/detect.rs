// src/paths/detect.rs

//! Directory detection by marker files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::errors::{Result, RuntreeError};
use crate::fs::{EntryKind, FileSystem};
use crate::paths::filter::DetectFn;
use crate::paths::path_utils::relative_str;
use crate::types::normalize_dir;

/// Directories that are never descended into while detecting.
const IGNORED_DIRS: &[&str] = &["node_modules", "target"];

/// Detection function returning every directory under `root` that directly
/// contains a file whose name matches one of `patterns` (globs such as
/// `go.mod` or `*.csproj`).
///
/// Hidden directories and common build output directories are not searched.
/// The walk happens each time the function is called.
pub fn detect_by_file<I, S>(
    fs: Arc<dyn FileSystem>,
    root: impl Into<PathBuf>,
    patterns: I,
) -> Result<DetectFn>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names = build_globset(patterns)?;
    let root = root.into();
    Ok(Arc::new(move || find_dirs_with(fs.as_ref(), &root, &names)))
}

/// Walk `root` and return the sorted relative directories containing a file
/// whose name matches `names`. Unreadable directories are logged and skipped.
pub fn find_dirs_with(fs: &dyn FileSystem, root: &Path, names: &GlobSet) -> Vec<String> {
    let mut dirs = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.entries(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        for entry in entries {
            let Some(name) = entry.name() else {
                continue;
            };

            match entry.kind {
                EntryKind::Dir => {
                    if !name.starts_with('.') && !IGNORED_DIRS.contains(&name) {
                        stack.push(entry.path);
                    }
                }
                EntryKind::File if names.is_match(name) => {
                    if let Some(rel) = relative_str(root, &dir) {
                        dirs.insert(normalize_dir(&rel));
                    }
                }
                _ => {}
            }
        }
    }

    dirs.into_iter().collect()
}

fn build_globset<I, S>(patterns: I) -> Result<GlobSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let pat = pat.as_ref();
        let glob = Glob::new(pat)
            .map_err(|e| RuntreeError::Pattern(format!("invalid file glob '{pat}': {e}")))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
