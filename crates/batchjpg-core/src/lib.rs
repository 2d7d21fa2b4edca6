//! batchjpg-core: shared errors, configuration, and work-item types.
//!
//! This crate is the foundational dependency for the other batchjpg crates,
//! providing the unified error type, the TOML-backed run configuration, and
//! the [`FileTask`] / [`Batch`] values that flow from the tree walker to the
//! worker pool.

pub mod config;
pub mod error;
pub mod task;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use task::{Batch, FileTask};
