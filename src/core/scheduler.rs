//! Tick-driven scheduler sweeping the live set of Processes.
//!
//! Every tick walks the whole live set once, running up to `max_executors`
//! Processes at a time: it launches a batch, waits for the whole batch, then
//! launches the next one. Nothing a Process does fails the tick.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::error::{ErrorSet, ExecutorError};
use crate::core::process::Process;
use crate::core::ticker::Ticker;

/// Default cap on Processes running at once within a sweep.
pub const DEFAULT_MAX_EXECUTORS: usize = 10;
/// Default bound on closing every module at shutdown.
pub const DEFAULT_DISPOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Scheduler lifecycle. Transitions are one-way: Starting, Started, Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Constructed, run loop not entered yet.
    Starting,
    /// Run loop active.
    Started,
    /// Run loop exited; terminal.
    Stopped,
}

/// Identity of a Process: tenant, package and queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessKey {
    /// Tenant id.
    pub tenant: String,
    /// Package id.
    pub package: String,
    /// Queue id.
    pub queue: String,
}

impl ProcessKey {
    /// Build a key.
    pub fn new(tenant: &str, package: &str, queue: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            package: package.to_string(),
            queue: queue.to_string(),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.package, self.queue)
    }
}

/// Concurrent map of live Processes.
///
/// Contract: `insert`, `remove` and `snapshot` may run concurrently from any
/// task without outside locking. A snapshot holds no lock once returned; a
/// sweep iterating it sees the set as of the snapshot, and changes made during
/// the sweep are picked up by the next one. No lock is ever held across an
/// `.await`.
#[derive(Debug, Default)]
pub struct ProcessMap {
    inner: DashMap<ProcessKey, Arc<Process>>,
}

impl ProcessMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any Process with the same key.
    pub fn insert(&self, process: Arc<Process>) -> Option<Arc<Process>> {
        self.inner.insert(process.key(), process)
    }

    /// Remove by key.
    pub fn remove(&self, key: &ProcessKey) -> Option<Arc<Process>> {
        self.inner.remove(key).map(|(_, p)| p)
    }

    /// Remove every Process of one package.
    pub fn remove_package(&self, tenant: &str, package: &str) -> Vec<Arc<Process>> {
        let keys: Vec<ProcessKey> = self
            .inner
            .iter()
            .filter(|e| e.key().tenant == tenant && e.key().package == package)
            .map(|e| e.key().clone())
            .collect();
        keys.iter().filter_map(|k| self.remove(k)).collect()
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &ProcessKey) -> bool {
        self.inner.contains_key(key)
    }

    /// Current Processes, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<Process>> {
        self.inner.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Current keys, in no particular order.
    pub fn keys(&self) -> Vec<ProcessKey> {
        self.inner.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of live Processes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Owner of the live Process set and the tick loop.
pub struct Scheduler {
    status: RwLock<Status>,
    ticker: Mutex<Box<dyn Ticker>>,
    processes: ProcessMap,
    max_executors: usize,
    dispose_timeout: Duration,
    sweeps: watch::Sender<u64>,
}

impl Scheduler {
    /// Create a scheduler; `max_executors == 0` selects [`DEFAULT_MAX_EXECUTORS`].
    pub fn new(ticker: Box<dyn Ticker>, max_executors: usize, dispose_timeout: Duration) -> Self {
        let max_executors = if max_executors == 0 {
            DEFAULT_MAX_EXECUTORS
        } else {
            max_executors
        };
        let (sweeps, _) = watch::channel(0);
        Self {
            status: RwLock::new(Status::Starting),
            ticker: Mutex::new(ticker),
            processes: ProcessMap::new(),
            max_executors,
            dispose_timeout,
            sweeps,
        }
    }

    /// Register a Process, overwriting one with the same key.
    pub fn add(&self, process: Arc<Process>) {
        let key = process.key();
        if self.processes.insert(process).is_some() {
            debug!(process = %key, "replaced process");
        } else {
            debug!(process = %key, "added process");
        }
    }

    /// Unregister a Process; no-op if absent.
    pub fn remove(&self, tenant: &str, package: &str, queue: &str) {
        if self.processes.remove(&ProcessKey::new(tenant, package, queue)).is_some() {
            debug!(tenant, package, queue, "removed process");
        }
    }

    /// The live set.
    pub const fn processes(&self) -> &ProcessMap {
        &self.processes
    }

    /// Cap on concurrently running Processes.
    pub const fn max_executors(&self) -> usize {
        self.max_executors
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        *self.status.read()
    }

    /// Move to `status`. Stopped is terminal: nothing leaves it.
    fn set_status(&self, status: Status) -> bool {
        let mut current = self.status.write();
        if *current == Status::Stopped {
            return false;
        }
        *current = status;
        true
    }

    /// Receiver of the completed-sweep counter.
    pub fn sweeps(&self) -> watch::Receiver<u64> {
        self.sweeps.subscribe()
    }

    /// Run the tick loop until `cancel` fires or the ticker closes.
    ///
    /// Cancellation is observed between ticks and between batches; Processes
    /// already launched always run to completion. A stopped scheduler never
    /// runs again.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = self.ticker.lock().await;
        if !self.set_status(Status::Started) {
            debug!("scheduler already stopped");
            return;
        }
        info!(max_executors = self.max_executors, "scheduler started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                tick = ticker.tick() => {
                    if tick.is_none() {
                        debug!("ticker closed");
                        break;
                    }
                    self.sweep(&cancel).await;
                }
            }
        }
        ticker.stop();
        self.set_status(Status::Stopped);
        info!("scheduler stopped");
    }

    /// Sweep the live set once. Does nothing unless the run loop is active.
    pub async fn sweep(&self, cancel: &CancellationToken) {
        if self.status() != Status::Started {
            debug!(status = ?self.status(), "scheduler not started, skipping sweep");
            return;
        }
        let mut batch = JoinSet::new();
        let mut launched = 0usize;
        for process in self.processes.snapshot() {
            if cancel.is_cancelled() {
                break;
            }
            batch.spawn(async move { process.process_events().await });
            launched += 1;
            if batch.len() == self.max_executors {
                drain(&mut batch).await;
            }
        }
        drain(&mut batch).await;
        self.sweeps.send_modify(|n| *n += 1);
        debug!(processes = launched, "sweep finished");
    }

    /// Close every module reachable from a registered Process.
    ///
    /// Bounded by the dispose timeout; a failing or late module never stops
    /// the remaining ones from being closed.
    pub async fn dispose(&self) -> Result<(), ExecutorError> {
        let deadline = tokio::time::Instant::now() + self.dispose_timeout;
        let mut errs = ErrorSet::new();
        for process in self.processes.snapshot() {
            for event in process.events().iter() {
                match tokio::time::timeout_at(deadline, event.module.close()).await {
                    Ok(res) => errs.collect(res),
                    Err(_) => errs.push(ExecutorError::Timeout(format!(
                        "closing module {}",
                        event.module.name()
                    ))),
                }
            }
        }
        errs.into_result()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("status", &self.status())
            .field("processes", &self.processes.len())
            .field("max_executors", &self.max_executors)
            .finish_non_exhaustive()
    }
}

async fn drain(batch: &mut JoinSet<()>) {
    while let Some(res) = batch.join_next().await {
        if let Err(err) = res {
            error!(error = %err, "process task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process::EventSet;
    use crate::core::ticker::ManualTicker;
    use crate::infra::MemQueue;

    fn process(tenant: &str, pkg: &str, queue: &str) -> Arc<Process> {
        Arc::new(Process::new(
            tenant,
            pkg,
            queue,
            Arc::new(EventSet::new()),
            Arc::new(MemQueue::new()),
            Duration::from_secs(1),
        ))
    }

    fn scheduler() -> Scheduler {
        let (ticker, _handle) = ManualTicker::channel();
        Scheduler::new(Box::new(ticker), 0, DEFAULT_DISPOSE_TIMEOUT)
    }

    #[test]
    fn test_zero_max_selects_default() {
        assert_eq!(scheduler().max_executors(), DEFAULT_MAX_EXECUTORS);
    }

    #[test]
    fn test_add_overwrites_by_key() {
        let s = scheduler();
        s.add(process("t1", "p1", "q1"));
        s.add(process("t1", "p1", "q1"));
        s.add(process("t1", "p1", "q2"));
        assert_eq!(s.processes().len(), 2);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let s = scheduler();
        s.add(process("t1", "p1", "q1"));
        s.remove("t1", "p1", "nope");
        s.remove("t1", "p1", "q1");
        s.remove("t1", "p1", "q1");
        assert!(s.processes().is_empty());
    }

    #[test]
    fn test_remove_package_only_touches_that_package() {
        let map = ProcessMap::new();
        map.insert(process("t1", "p1", "q1"));
        map.insert(process("t1", "p1", "q2"));
        map.insert(process("t1", "p2", "q1"));
        map.insert(process("t2", "p1", "q1"));
        assert_eq!(map.remove_package("t1", "p1").len(), 2);
        assert_eq!(map.len(), 2);
        assert!(map.contains(&ProcessKey::new("t1", "p2", "q1")));
        assert!(map.contains(&ProcessKey::new("t2", "p1", "q1")));
    }

    #[test]
    fn test_initial_status_is_starting() {
        assert_eq!(scheduler().status(), Status::Starting);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let s = scheduler();
        assert!(s.set_status(Status::Started));
        assert!(s.set_status(Status::Stopped));
        assert!(!s.set_status(Status::Started));
        assert!(!s.set_status(Status::Starting));
        assert_eq!(s.status(), Status::Stopped);
    }

    #[tokio::test]
    async fn test_sweep_outside_run_loop_is_skipped() {
        let s = scheduler();
        let queue = Arc::new(MemQueue::new());
        s.add(Arc::new(Process::new(
            "t1",
            "p1",
            "q1",
            Arc::new(EventSet::new()),
            queue.clone(),
            Duration::from_secs(1),
        )));
        let sweeps = s.sweeps();

        s.sweep(&CancellationToken::new()).await;
        s.set_status(Status::Started);
        s.set_status(Status::Stopped);
        s.sweep(&CancellationToken::new()).await;

        assert_eq!(queue.dequeue_calls(), 0);
        assert_eq!(*sweeps.borrow(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_sweep_launches_nothing() {
        let s = scheduler();
        let queue = Arc::new(MemQueue::new());
        for q in ["q1", "q2", "q3"] {
            s.add(Arc::new(Process::new(
                "t1",
                "p1",
                q,
                Arc::new(EventSet::new()),
                queue.clone(),
                Duration::from_secs(1),
            )));
        }
        s.set_status(Status::Started);

        let cancel = CancellationToken::new();
        cancel.cancel();
        s.sweep(&cancel).await;
        assert_eq!(queue.dequeue_calls(), 0);
        assert_eq!(*s.sweeps().borrow(), 1);
    }
}
