//! Shared run context.
//!
//! [`RunContext`] bundles everything a run needs: immutable settings in
//! `Arc`s plus the cloneable pool and shutdown handles. Every clone refers to
//! the same underlying state, so the pipeline, the signal listener and tests
//! can each hold one.

use std::sync::Arc;

use batchjpg_core::config::Config;

use crate::conversion::Converter;
use crate::pool::{self, WorkerPool};
use crate::scanner::{ExclusionSet, WalkRules};
use crate::shutdown::ShutdownCoordinator;
use crate::stats::RunStats;

#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub exclusions: Arc<ExclusionSet>,
    pub converter: Arc<dyn Converter>,
    pub pool: WorkerPool,
    pub shutdown: ShutdownCoordinator,
    pub stats: Arc<RunStats>,
}

impl RunContext {
    /// Build a context sized for this host.
    pub fn new(config: Config, exclusions: ExclusionSet, converter: Arc<dyn Converter>) -> Self {
        let workers = config.workers.concurrency(pool::available_parallelism());
        Self::with_workers(config, exclusions, converter, workers)
    }

    /// Build a context with an explicit worker count.
    pub fn with_workers(
        config: Config,
        exclusions: ExclusionSet,
        converter: Arc<dyn Converter>,
        workers: usize,
    ) -> Self {
        Self {
            config: Arc::new(config),
            exclusions: Arc::new(exclusions),
            converter,
            pool: WorkerPool::new(workers),
            shutdown: ShutdownCoordinator::new(),
            stats: Arc::new(RunStats::default()),
        }
    }

    pub fn walk_rules(&self) -> WalkRules {
        WalkRules::from_config(&self.config.scan, Arc::clone(&self.exclusions))
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("exclusions", &self.exclusions)
            .field("converter", &self.converter.name())
            .field("pool", &self.pool)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}
