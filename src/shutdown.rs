//! Graceful shutdown coordination.
//!
//! The first termination request moves the run from `Running` to `Draining`:
//! the pipeline stops submitting batches and waits for in-flight jobs, which
//! are never killed. Further requests are no-ops. Real signals and tests go
//! through the same [`ShutdownCoordinator::request_drain`] entry point.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a run with respect to shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownState {
    Running,
    Draining,
    Terminated,
}

struct Inner {
    state: Mutex<ShutdownState>,
    drain: CancellationToken,
    stopped: CancellationToken,
    requests: AtomicUsize,
}

/// Shared handle owning the shutdown state machine.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ShutdownState::Running),
                drain: CancellationToken::new(),
                stopped: CancellationToken::new(),
                requests: AtomicUsize::new(0),
            }),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.inner.state.lock()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.drain.is_cancelled()
    }

    /// Total termination requests received, including ignored repeats.
    pub fn requests(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Ask the run to drain. Returns `true` only for the request that
    /// actually started draining.
    pub fn request_drain(&self, reason: &str) -> bool {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);

        let mut state = self.inner.state.lock();
        match *state {
            ShutdownState::Running => {
                *state = ShutdownState::Draining;
                drop(state);
                tracing::warn!(reason, "Shutting down gracefully; waiting for in-flight conversions");
                self.inner.drain.cancel();
                true
            }
            ShutdownState::Draining => {
                tracing::info!(reason, "Already draining; ignoring repeated request");
                false
            }
            ShutdownState::Terminated => {
                tracing::debug!(reason, "Shutdown request after termination ignored");
                false
            }
        }
    }

    /// Resolves once draining has begun.
    pub async fn drained(&self) {
        self.inner.drain.cancelled().await
    }

    /// Mark the run finished. Returns the state it was in before.
    pub fn terminate(&self) -> ShutdownState {
        let previous = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut *state, ShutdownState::Terminated)
        };
        self.inner.stopped.cancel();
        previous
    }

    /// Spawn a task translating SIGINT/SIGTERM (Ctrl+C elsewhere) into drain
    /// requests. The task keeps absorbing signals until [`terminate`] is
    /// called, so a second Ctrl+C does not kill the process mid-drain.
    ///
    /// [`terminate`]: ShutdownCoordinator::terminate
    pub fn spawn_signal_listener(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.listen_for_signals().await })
    }

    async fn listen_for_signals(self) {
        #[cfg(unix)]
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    None
                }
            };

        loop {
            #[cfg(unix)]
            let terminate = async {
                match sigterm.as_mut() {
                    Some(s) => {
                        s.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => {
                            self.request_drain("SIGINT");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                            self.inner.stopped.cancelled().await;
                            break;
                        }
                    }
                }
                _ = terminate => {
                    self.request_drain("SIGTERM");
                }
                _ = self.inner.stopped.cancelled() => break,
            }
        }
    }
}

/// Wait for a task returned by [`ShutdownCoordinator::spawn_signal_listener`].
///
/// Returns `false` if the listener panicked or was cancelled.
pub async fn join_listener(listener: tokio::task::JoinHandle<()>) -> bool {
    match listener.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Signal listener did not exit cleanly");
            false
        }
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("state", &self.state())
            .field("requests", &self.requests())
            .finish()
    }
}
