// src/paths/pattern.rs

use std::fmt;

use regex::Regex;

use crate::errors::{Result, RuntreeError};

const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Directory pattern used by include/exclude lists and skip rules.
///
/// Patterns are regular expressions matched (unanchored) against resolved
/// directory strings such as `services/api`. A pattern without any regex
/// metacharacters is also a literal directory and is resolved even when the
/// filter has no detection function.
#[derive(Clone)]
pub struct Pattern {
    raw: String,
    regex: Regex,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.raw).finish()
    }
}

impl Pattern {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let regex = Regex::new(&raw)
            .map_err(|e| RuntreeError::Pattern(format!("invalid directory pattern '{raw}': {e}")))?;
        Ok(Self { raw, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_literal(&self) -> bool {
        !self.raw.contains(REGEX_META)
    }

    pub fn matches(&self, dir: &str) -> bool {
        self.regex.is_match(dir)
    }
}

/// Compile every pattern, failing on the first invalid one.
pub fn compile_all<I, S>(patterns: I) -> Result<Vec<Pattern>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    patterns.into_iter().map(Pattern::new).collect()
}
