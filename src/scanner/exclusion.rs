//! Relative-path exclusion rules.

use batchjpg_core::task::normalize_relative;
use std::path::Path;

/// Immutable set of relative-path prefixes supplied with `--exclude`.
///
/// Matching is a raw string-prefix test against the normalized relative path,
/// so `photos/raw` also excludes `photos/raw-exports`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    prefixes: Vec<String>,
}

impl ExclusionSet {
    /// Build the set, normalizing each prefix the same way walked paths are.
    ///
    /// Empty prefixes would exclude the whole tree and are dropped.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for raw in prefixes {
            let raw = raw.as_ref();
            let prefix = normalize_prefix(raw);
            if prefix.is_empty() {
                tracing::warn!(exclude = raw, "Ignoring empty exclude prefix");
                continue;
            }
            if !normalized.contains(&prefix) {
                normalized.push(prefix);
            }
        }
        Self {
            prefixes: normalized,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether a normalized relative path is excluded.
    pub fn is_excluded(&self, relative: &str) -> bool {
        is_excluded(relative, &self.prefixes)
    }
}

/// True iff `relative` starts with any of `prefixes`.
pub fn is_excluded(relative: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| relative.starts_with(prefix.as_str()))
}

fn normalize_prefix(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let trailing_slash = unified.ends_with('/') && unified.len() > 1;
    let mut prefix = normalize_relative(Path::new(&unified));
    if trailing_slash && !prefix.is_empty() {
        prefix.push('/');
    }
    prefix
}
