//! Long-running service wrapper around an [`Executor`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{AppResult, ErrorSet, Executor, ExecutorError, Status};

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag: the scheduler loop is running.
    pub ok: bool,
    /// Scheduler status.
    pub status: Status,
    /// Registered Processes.
    pub processes: usize,
}

/// Drives one executor: optional start delay, serve until shut down, dispose.
#[derive(Debug)]
pub struct ExecutorService {
    executor: Arc<Executor>,
    cancel: CancellationToken,
    serving: watch::Sender<bool>,
}

impl ExecutorService {
    /// Wrap `executor`.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            cancel: CancellationToken::new(),
            serving: watch::Sender::new(false),
        }
    }

    /// The wrapped executor.
    pub const fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current health.
    pub fn health(&self) -> Health {
        let scheduler = self.executor.scheduler();
        Health {
            ok: self.executor.is_up(),
            status: scheduler.status(),
            processes: scheduler.processes().len(),
        }
    }

    /// Wait for the configured start delay, then run until shut down.
    ///
    /// # Errors
    ///
    /// Fails when the initial catalog load or subscription fails.
    pub async fn serve(&self) -> AppResult<()> {
        self.serving.send_replace(true);
        let res = if self.cancel.is_cancelled() {
            Ok(())
        } else {
            self.serve_until_cancelled().await
        };
        self.serving.send_replace(false);
        res
    }

    async fn serve_until_cancelled(&self) -> AppResult<()> {
        let delay = self.executor.config().start_delay();
        if !delay.is_zero() {
            info!(delay_ms = delay.as_millis(), "delaying executor start");
            tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
        info!("executor starting");
        self.executor.start(self.cancel.clone()).await?;
        info!("executor stopped");
        Ok(())
    }

    /// Ask [`serve`](Self::serve) to return.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Shut down and release every module, the runtime and the clients.
    ///
    /// Nothing is closed before [`serve`](Self::serve) has returned, so a sweep
    /// in flight finishes its whole batch first. The wait is bounded by the
    /// dispose timeout.
    ///
    /// # Errors
    ///
    /// Returns every close failure, joined, plus a timeout if serving did not
    /// end in time.
    pub async fn dispose(&self) -> Result<(), ExecutorError> {
        self.shutdown();
        let mut errs = ErrorSet::new();
        let bound = self.executor.config().dispose_timeout();
        let mut serving = self.serving.subscribe();
        let stopped = async move { serving.wait_for(|s| !*s).await.map(|_| ()) };
        if tokio::time::timeout(bound, stopped).await.is_err() {
            warn!(timeout_ms = bound.as_millis(), "executor still serving, closing anyway");
            errs.push(ExecutorError::Timeout("waiting for the executor to stop".into()));
        }
        errs.collect(self.executor.close().await);
        errs.into_result()
    }
}
