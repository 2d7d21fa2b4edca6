//! Image conversion.
//!
//! This module turns discovered files into converted outputs. It includes:
//!
//! - The [`Converter`] capability and its `cjpeg`-backed implementation
//! - [`ConversionJob`], one attempt per file with optional removal of the
//!   original
//! - [`fake::RecordingConverter`], an in-memory converter for tests

mod converter;
pub mod fake;
mod job;

pub use converter::{CjpegConverter, Converter};
pub use job::{ConversionJob, ConversionOutcome, JobFailure};
