//! Work items produced by the tree walker.

use std::path::{Path, PathBuf};

/// A single file discovered under the scan root.
///
/// Created by the walker once the file passes every filter and consumed
/// exactly once by a conversion job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileTask {
    path: PathBuf,
    relative: String,
}

impl FileTask {
    /// Create a task from the full path and its normalized relative form.
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
        }
    }

    /// Full path of the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the scan root, with `/` separators.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Where the converted file is written: same directory and stem, with the
    /// target extension.
    pub fn destination(&self, target_extension: &str) -> PathBuf {
        self.path.with_extension(target_extension)
    }
}

/// A bounded group of tasks handed to the worker pool together.
pub type Batch = Vec<FileTask>;

/// Render a relative path with forward slashes regardless of platform.
pub fn normalize_relative(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if let std::path::Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}
