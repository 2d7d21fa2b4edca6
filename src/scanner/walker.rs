//! Iterative directory walker that yields bounded batches.
//!
//! The walk keeps an explicit stack of pending directories instead of
//! recursing, so arbitrarily deep trees cost one stack frame. Batches are
//! yielded as soon as they fill, which lets the worker pool start converting
//! while the rest of the tree is still being listed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use batchjpg_core::config::ScanConfig;
use batchjpg_core::task::normalize_relative;
use batchjpg_core::{Batch, Error, FileTask};
use tokio::fs::{DirEntry, ReadDir};

use super::exclusion::ExclusionSet;

/// Counters describing a walk so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories successfully listed.
    pub dirs_visited: u64,
    /// Directories that could not be listed, or whose listing failed part
    /// way through.
    pub dirs_skipped: u64,
    /// Eligible files appended to a batch.
    pub files_found: u64,
}

/// Filters applied to every directory entry.
#[derive(Debug, Clone)]
pub struct WalkRules {
    /// Lowercase extension without the dot.
    pub source_extension: String,
    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,
    pub exclusions: Arc<ExclusionSet>,
}

impl WalkRules {
    pub fn from_config(scan: &ScanConfig, exclusions: Arc<ExclusionSet>) -> Self {
        Self {
            source_extension: scan.normalized_extension(),
            skip_dirs: scan.skip_dirs.clone(),
            exclusions,
        }
    }

    fn skips_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.skip_dirs.iter().any(|d| d == name)
    }

    fn accepts_file(&self, name: &str, path: &Path) -> bool {
        if name.starts_with('.') {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.source_extension))
    }
}

/// Lazy, single-pass producer of [`Batch`]es under a root directory.
pub struct TreeWalker {
    root: PathBuf,
    rules: WalkRules,
    max_per_batch: usize,
    stack: Vec<PathBuf>,
    /// Directory currently being listed.
    listing: Option<(PathBuf, ReadDir)>,
    batch: Batch,
    stats: WalkStats,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>, rules: WalkRules, max_per_batch: usize) -> Self {
        let root = root.into();
        let max_per_batch = max_per_batch.max(1);
        Self {
            stack: vec![root.clone()],
            root,
            rules,
            max_per_batch,
            listing: None,
            batch: Vec::with_capacity(max_per_batch.min(1024)),
            stats: WalkStats::default(),
        }
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Produce the next batch, or `None` once the tree is exhausted.
    ///
    /// A full batch is returned immediately, even part-way through a
    /// directory listing; the listing resumes on the next call.
    pub async fn next_batch(&mut self) -> Option<Batch> {
        loop {
            if self.batch.len() >= self.max_per_batch {
                return Some(self.take_batch());
            }

            let Some((dir, listing)) = self.listing.as_mut() else {
                match self.stack.pop() {
                    Some(dir) => {
                        self.open(dir).await;
                        continue;
                    }
                    None => break,
                }
            };

            match listing.next_entry().await {
                Ok(Some(entry)) => self.visit(entry).await,
                Ok(None) => self.listing = None,
                Err(e) => {
                    let dir = dir.clone();
                    self.listing = None;
                    self.skip_dir(&dir, e, "Directory listing interrupted, skipping remaining entries");
                }
            }
        }

        if self.batch.is_empty() {
            None
        } else {
            Some(self.take_batch())
        }
    }

    /// Drain the whole tree into a single list. Intended for small trees and
    /// dry runs; the pipeline consumes batches one at a time instead.
    pub async fn collect_all(mut self) -> (Vec<FileTask>, WalkStats) {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await {
            all.extend(batch);
        }
        (all, self.stats)
    }

    /// Drop files accumulated for a batch that will never be yielded and
    /// return how many there were. Used when a run stops mid-walk.
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.batch.len();
        self.batch.clear();
        self.listing = None;
        self.stack.clear();
        discarded
    }

    fn take_batch(&mut self) -> Batch {
        let capacity = self.max_per_batch.min(1024);
        std::mem::replace(&mut self.batch, Vec::with_capacity(capacity))
    }

    async fn open(&mut self, dir: PathBuf) {
        match tokio::fs::read_dir(&dir).await {
            Ok(listing) => {
                self.stats.dirs_visited += 1;
                self.listing = Some((dir, listing));
            }
            Err(e) => self.skip_dir(&dir, e, "Skipping unreadable directory"),
        }
    }

    fn skip_dir(&mut self, dir: &Path, source: std::io::Error, message: &str) {
        self.stats.dirs_skipped += 1;
        let err = Error::directory_read(dir, source);
        tracing::warn!(path = %dir.display(), error = %err, "{}", message);
    }

    async fn visit(&mut self, entry: DirEntry) {
        let path = entry.path();
        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) => normalize_relative(rel),
            Err(_) => return,
        };

        if self.rules.exclusions.is_excluded(&relative) {
            tracing::debug!(path = %relative, "Excluded");
            return;
        }

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        let is_dir = match entry.file_type().await {
            Ok(ft) => ft.is_dir(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not determine entry type");
                return;
            }
        };

        if is_dir {
            if self.rules.skips_dir(&name) {
                tracing::trace!(path = %relative, "Skipping directory");
            } else {
                self.stack.push(path);
            }
        } else if self.rules.accepts_file(&name, &path) {
            self.stats.files_found += 1;
            self.batch.push(FileTask::new(path, relative));
        }
    }
}
