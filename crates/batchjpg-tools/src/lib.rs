//! # batchjpg-tools
//!
//! External tool management for the batchjpg pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the path to
//!   `cjpeg`, honouring a configured override.
//! - **Command execution** ([`ToolCommand`]) -- async builder for running
//!   external processes with captured output.
//! - **Encoding** ([`encode_jpeg`]) -- one `cjpeg` invocation per source file.

pub mod command;
pub mod jpeg;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use jpeg::{cjpeg_args, encode_jpeg};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry, CJPEG};
