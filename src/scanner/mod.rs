//! Image discovery.
//!
//! This module walks a root directory to discover the files a run will
//! convert:
//!
//! - [`ExclusionSet`] decides whether a relative path was excluded by the user
//! - [`TreeWalker`] performs the explicit-stack walk and yields bounded batches

pub mod exclusion;
pub mod walker;

pub use exclusion::{is_excluded, ExclusionSet};
pub use walker::{TreeWalker, WalkRules, WalkStats};
