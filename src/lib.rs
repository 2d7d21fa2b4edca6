//! batchjpg - recursive PNG to JPEG batch converter
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod context;
pub mod conversion;
pub mod pipeline;
pub mod pool;
pub mod scanner;
pub mod shutdown;
pub mod stats;
