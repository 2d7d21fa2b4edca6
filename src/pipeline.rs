//! Batch conversion driver.
//!
//! Walks the tree batch by batch, hands every file of a batch to the worker
//! pool, and stops submitting as soon as draining begins. Jobs already handed
//! to the pool always run to completion; the run only returns once the pool
//! is idle.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use batchjpg_core::{Batch, Error, Result};

use crate::context::RunContext;
use crate::conversion::ConversionJob;
use crate::scanner::TreeWalker;
use crate::stats::RunSummary;

/// Convert every eligible file under `root`.
///
/// # Errors
///
/// Returns [`Error::ShutdownWait`] if waiting for in-flight jobs failed.
/// Per-file failures are counted in the summary, never returned.
pub async fn run(ctx: &RunContext, root: &Path) -> Result<RunSummary> {
    let started = Instant::now();
    let scan = &ctx.config.scan;
    let limit = scan.max_outstanding_files();
    let target_extension = ctx.config.conversion.normalized_extension();
    let delete_original = ctx.config.conversion.delete_original;

    tracing::info!(
        root = %root.display(),
        workers = ctx.pool.capacity(),
        batch_size = scan.max_files_per_batch,
        converter = ctx.converter.name(),
        delete_original,
        "Starting conversion"
    );

    let mut walker = TreeWalker::new(root, ctx.walk_rules(), scan.max_files_per_batch);
    let mut batch_no = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.shutdown.drained() => break,
            next = walker.next_batch() => next,
        };
        let Some(batch) = next else { break };
        batch_no += 1;

        if ctx.shutdown.is_draining() {
            abandon(ctx, batch_no, &batch);
            break;
        }

        let has_room = tokio::select! {
            biased;
            _ = ctx.shutdown.drained() => false,
            _ = ctx.pool.wait_for_room(limit, batch.len()) => true,
        };
        if !has_room {
            abandon(ctx, batch_no, &batch);
            break;
        }

        tracing::debug!(batch = batch_no, files = batch.len(), "Submitting batch");
        submit_batch(ctx, batch, &target_extension, delete_original);
    }

    let interrupted = ctx.shutdown.is_draining();
    if interrupted {
        let leftover = walker.discard_pending();
        if leftover > 0 {
            ctx.stats.record_abandoned(leftover);
        }
        let counts = ctx.pool.counts();
        tracing::info!(
            active = counts.active,
            pending = counts.pending,
            "Waiting for in-flight conversions to finish"
        );
    }

    let idle = ctx.pool.await_idle().await;
    ctx.shutdown.terminate();
    if let Err(e) = idle {
        tracing::error!(error = %e, "Failed waiting for workers");
        return Err(match e {
            Error::ShutdownWait(_) => e,
            other => Error::ShutdownWait(other.to_string()),
        });
    }

    let summary = ctx
        .stats
        .summarize(walker.stats(), interrupted, started.elapsed());
    tracing::info!(
        converted = summary.converted,
        failed = summary.failed,
        originals_deleted = summary.originals_deleted,
        interrupted,
        "Run finished"
    );
    Ok(summary)
}

fn submit_batch(ctx: &RunContext, batch: Batch, target_extension: &str, delete_original: bool) {
    ctx.stats.record_submitted(batch.len());
    for task in batch {
        let job = ConversionJob::new(task, target_extension, delete_original);
        let converter = Arc::clone(&ctx.converter);
        let stats = Arc::clone(&ctx.stats);
        ctx.pool.submit(async move {
            let outcome = job.run(converter.as_ref()).await;
            stats.record_outcome(&outcome);
        });
    }
}

fn abandon(ctx: &RunContext, batch_no: u64, batch: &Batch) {
    tracing::info!(batch = batch_no, files = batch.len(), "Draining; batch not submitted");
    ctx.stats.record_abandoned(batch.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::fake::RecordingConverter;
    use crate::scanner::ExclusionSet;
    use crate::shutdown::ShutdownState;
    use batchjpg_core::config::Config;
    use std::fs;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn context(converter: RecordingConverter, workers: usize, batch: usize) -> RunContext {
        let mut config = Config::default();
        config.scan.max_files_per_batch = batch;
        config.scan.max_outstanding_batches = 2;
        RunContext::with_workers(config, ExclusionSet::default(), Arc::new(converter), workers)
    }

    fn populate(root: &Path, count: usize) {
        for i in 0..count {
            fs::write(root.join(format!("img_{i:02}.png")), b"png").unwrap();
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    #[tokio::test]
    async fn drain_stops_new_batches_and_finishes_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 10);
        let gate = Arc::new(Semaphore::new(0));
        let converter = RecordingConverter::new().with_gate(gate.clone());
        let ctx = context(converter.clone(), 1, 2);

        let handle = {
            let ctx = ctx.clone();
            let root = dir.path().to_path_buf();
            tokio::spawn(async move { run(&ctx, &root).await })
        };

        // Two batches of two fill the outstanding limit; the third waits.
        wait_until(|| ctx.pool.counts().outstanding() == 4).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(ctx.shutdown.request_drain("SIGINT"));
        assert!(!ctx.shutdown.request_drain("SIGINT"));
        gate.add_permits(10);

        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run did not finish after drain")
            .unwrap()
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.submitted, 4);
        assert_eq!(summary.converted, 4);
        assert_eq!(summary.abandoned, 2);
        assert_eq!(summary.discovered, 6);
        assert_eq!(summary.discovered, summary.submitted + summary.abandoned);
        assert_eq!(converter.call_count(), 4);
        assert!(ctx.pool.counts().is_idle());
        assert_eq!(ctx.shutdown.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn drain_before_start_submits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 5);
        let converter = RecordingConverter::new();
        let ctx = context(converter.clone(), 2, 2);

        ctx.shutdown.request_drain("test");
        let summary = run(&ctx, dir.path()).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.submitted, 0);
        assert_eq!(converter.call_count(), 0);
        for i in 0..5 {
            assert!(!dir.path().join(format!("img_{i:02}.jpg")).exists());
        }
    }

    #[tokio::test]
    async fn uninterrupted_run_converts_everything() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 9);
        let converter = RecordingConverter::new();
        let ctx = context(converter.clone(), 3, 2);

        let summary = run(&ctx, dir.path()).await.unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.discovered, 9);
        assert_eq!(summary.submitted, 9);
        assert_eq!(summary.converted, 9);
        assert_eq!(summary.abandoned, 0);
        assert_eq!(converter.call_count(), 9);
    }

    #[tokio::test]
    async fn panicking_job_surfaces_shutdown_wait_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.png"), b"png").unwrap();
        fs::write(dir.path().join("boom.png"), b"png").unwrap();
        let converter = RecordingConverter::new().panic_on("boom.png");
        let ctx = context(converter, 2, 10);

        let err = run(&ctx, dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::ShutdownWait(_)));
        assert!(err.is_fatal());
        assert_eq!(ctx.shutdown.state(), ShutdownState::Terminated);
    }
}
