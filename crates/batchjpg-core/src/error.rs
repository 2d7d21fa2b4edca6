//! Unified error type for batchjpg.
//!
//! Every failure mode of a run funnels into [`Error`]. Per-file errors
//! ([`Error::DirectoryRead`], [`Error::Conversion`], [`Error::Deletion`]) are
//! logged and recovered where they occur; only [`Error::ShutdownWait`] is
//! allowed to escalate to a process-level failure (see [`Error::is_fatal`]).

use std::path::{Path, PathBuf};

/// Unified error type covering all failure modes in batchjpg.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A directory could not be listed during the tree walk.
    #[error("Failed to read directory {}: {source}", .path.display())]
    DirectoryRead {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The external converter failed for a single file.
    #[error("Failed to convert {}: {message}", .path.display())]
    Conversion {
        /// The source file that was being converted.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// The original file could not be removed after a successful conversion.
    #[error("Failed to delete original {}: {source}", .path.display())]
    Deletion {
        /// The original file that was left in place.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting for the worker pool to become idle failed.
    #[error("Shutdown wait failed: {0}")]
    ShutdownWait(String),

    /// An external tool (cjpeg, ...) could not be run or exited with an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether this error must abort the run.
    ///
    /// Everything except a failed shutdown wait is recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ShutdownWait(_))
    }

    /// Convenience constructor for [`Error::DirectoryRead`].
    pub fn directory_read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::DirectoryRead {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Conversion`].
    pub fn conversion(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Error::Conversion {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Deletion`].
    pub fn deletion(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Deletion {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
