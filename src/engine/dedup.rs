// src/engine/dedup.rs

//! Run-wide deduplication of task occurrences.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::types::TaskId;

/// One task in one resolved directory; empty `path` is the root.
///
/// A task bound to two directories runs once in each.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub task: TaskId,
    pub path: String,
}

/// Shared "has this occurrence run" map for one top-level invocation.
///
/// Cloned (via `Arc`) into every branch of a parallel group; `claim` is the
/// only mutation and is atomic under the lock.
#[derive(Debug, Default)]
pub struct DedupTracker {
    claimed: Mutex<HashSet<DedupKey>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-mark. Returns `true` for the first caller only.
    pub fn claim(&self, key: DedupKey) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key)
    }

    /// Claim every key; `true` if at least one was new.
    pub fn claim_any<I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = DedupKey>,
    {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        keys.into_iter()
            .fold(false, |fresh, key| claimed.insert(key) || fresh)
    }
}
