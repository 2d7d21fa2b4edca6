//! A single unit of conversion work.

use std::path::PathBuf;

use batchjpg_core::{Error, FileTask};

use super::converter::Converter;

/// Why a job did not fully succeed.
#[derive(Debug)]
pub enum JobFailure {
    /// The converter failed; nothing was produced.
    Conversion(Error),
    /// The output was produced but the original could not be removed.
    Deletion { destination: PathBuf, error: Error },
}

/// Terminal result of running one job.
#[derive(Debug)]
pub enum ConversionOutcome {
    Success {
        destination: PathBuf,
        original_deleted: bool,
    },
    Failure(JobFailure),
}

impl ConversionOutcome {
    /// Whether a converted file now exists at the destination.
    pub fn produced_output(&self) -> bool {
        matches!(
            self,
            ConversionOutcome::Success { .. }
                | ConversionOutcome::Failure(JobFailure::Deletion { .. })
        )
    }
}

/// Converts one file and optionally removes the original afterwards.
///
/// A job makes exactly one attempt. Re-running is safe: the source is only
/// ever read and the destination is overwritten.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    task: FileTask,
    target_extension: String,
    delete_original: bool,
}

impl ConversionJob {
    pub fn new(task: FileTask, target_extension: impl Into<String>, delete_original: bool) -> Self {
        Self {
            task,
            target_extension: target_extension.into(),
            delete_original,
        }
    }

    pub fn destination(&self) -> PathBuf {
        self.task.destination(&self.target_extension)
    }

    /// Run the job to completion. Errors are logged and returned inside the
    /// outcome; they never escape as `Err`.
    pub async fn run(self, converter: &dyn Converter) -> ConversionOutcome {
        let source = self.task.path();
        let destination = self.destination();

        if let Err(e) = converter.convert(source, &destination).await {
            tracing::error!(
                path = %source.display(),
                converter = converter.name(),
                error = %e,
                "Conversion failed"
            );
            return ConversionOutcome::Failure(JobFailure::Conversion(e));
        }

        tracing::info!(
            path = %source.display(),
            output = %destination.display(),
            "Converted"
        );

        if !self.delete_original {
            return ConversionOutcome::Success {
                destination,
                original_deleted: false,
            };
        }

        match tokio::fs::remove_file(source).await {
            Ok(()) => {
                tracing::info!(path = %source.display(), "Deleted original");
                ConversionOutcome::Success {
                    destination,
                    original_deleted: true,
                }
            }
            Err(e) => {
                let error = Error::deletion(source, e);
                tracing::warn!(path = %source.display(), error = %error, "Converted but original was kept");
                ConversionOutcome::Failure(JobFailure::Deletion { destination, error })
            }
        }
    }
}
