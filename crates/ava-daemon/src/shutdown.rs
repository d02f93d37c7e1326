//! Shutdown coordination.
//!
//! A single process-wide interrupt cancels one shared [`CancellationToken`].
//! Every dispatch worker observes that token directly, so one interrupt is
//! enough to end all of them regardless of which one notices first. The
//! coordinator then waits on the join barrier of all workers and tears the
//! plugins down, once each and in load order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ava_core::DaemonState;
use ava_plugins::Plugin;

use crate::dispatch::WorkerExit;

/// Owns the shared shutdown token and publishes the daemon state.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    state: watch::Sender<DaemonState>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(DaemonState::Starting);
        Self {
            token: CancellationToken::new(),
            state,
        }
    }

    /// Token handed to every dispatch worker.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request shutdown of all workers. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn subscribe(&self) -> watch::Receiver<DaemonState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DaemonState {
        *self.state.borrow()
    }

    pub fn set_state(&self, next: DaemonState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!(from = %prev, to = %next, "daemon state changed");
        }
    }

    /// Cancel the shared token when `signal` resolves.
    ///
    /// The returned task is aborted by the caller once the workers are gone
    /// for another reason.
    pub fn listen<S>(&self, signal: S) -> JoinHandle<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal => {
                    info!("interrupt received, shutting down");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    }

    /// Completion barrier: wait until every worker in `workers` has returned.
    ///
    /// Each worker counts exactly once, whether it saw the token, lost its
    /// adapter, or panicked.
    pub async fn wait_for_workers(&self, workers: &mut JoinSet<(String, WorkerExit)>) -> usize {
        let mut finished = 0;
        while let Some(joined) = workers.join_next().await {
            finished += 1;
            match joined {
                Ok((adapter, exit)) => {
                    info!(adapter = %adapter, reason = ?exit, "worker joined");
                }
                Err(e) => error!(error = %e, "dispatch worker panicked"),
            }
        }
        finished
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop every plugin once, in load order.
///
/// Best-effort: a failing teardown is logged and the rest still run. Returns
/// the number of failures.
pub async fn teardown_plugins(plugins: &[Arc<dyn Plugin>]) -> usize {
    info!(plugins = plugins.len(), "Teardown...");
    let mut failures = 0;
    for plugin in plugins {
        if let Err(e) = plugin.stop().await {
            failures += 1;
            warn!(plugin = plugin.name(), error = %e, "plugin teardown failed");
        }
    }
    failures
}

/// Resolves on the first Ctrl-C / SIGINT.
///
/// If the handler cannot be installed the daemon can only stop when its
/// adapters close, so this then never resolves.
pub async fn interrupt_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(e) => {
            error!(error = %e, "unable to listen for interrupt signal");
            std::future::pending::<()>().await;
        }
    }
}
