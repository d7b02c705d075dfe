//! Processes: the per-queue workers the scheduler sweeps.
//!
//! A [`Process`] drains one (tenant, package, queue) and dispatches each item
//! to the [`Event`] named by the item, not by the queue. All Processes built
//! from one package share that package's [`EventSet`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::core::client::QueueClient;
use crate::core::error::ExecutorError;
use crate::core::model::{JobResult, JobResultKind, QueueItem, ResultDef, NO_ERROR};
use crate::core::module::{self, ModuleHandle};
use crate::core::recorder::RecorderSender;
use crate::core::scheduler::ProcessKey;

/// An event bound to its module and routing rule.
#[derive(Debug)]
pub struct Event {
    /// Event id.
    pub id: String,
    /// Where outcomes go.
    pub next_step: ResultDef,
    /// Module owned exclusively by this event.
    pub module: ModuleHandle,
    /// Recorder sender for results and guest logs.
    pub log_sender: RecorderSender,
}

/// Background closes of modules whose [`EventSet`] was dropped.
///
/// Clones share one task set, so the owner can wait for every release before
/// tearing down the runtime the modules came from.
#[derive(Clone, Default)]
pub struct ModuleReleases {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl ModuleReleases {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_on<F>(&self, task: F, handle: &Handle)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.lock().spawn_on(task, handle);
    }

    /// Releases spawned and not yet waited for.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Wait for every release spawned so far, including ones spawned while
    /// waiting.
    pub async fn wait(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.tasks.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(res) = tasks.join_next().await {
                if let Err(err) = res {
                    error!(error = %err, "module release task failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for ModuleReleases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleReleases")
            .field("pending", &self.pending())
            .finish()
    }
}

/// The events of one package, keyed by event id.
///
/// Dropping the set closes every module it still owns. Processes hold the set
/// through an `Arc`, so a replaced package's modules are closed only once the
/// last Process referencing them (including one mid-sweep) is gone.
#[derive(Debug, Default)]
pub struct EventSet {
    events: HashMap<String, Event>,
    releases: Option<ModuleReleases>,
}

impl EventSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set whose module closes on drop are tracked by
    /// `releases`.
    pub fn with_releases(releases: ModuleReleases) -> Self {
        Self {
            events: HashMap::new(),
            releases: Some(releases),
        }
    }

    /// Add an event, replacing one with the same id.
    pub fn insert(&mut self, event: Event) -> Option<Event> {
        self.events.insert(event.id.clone(), event)
    }

    /// Resolve an event id.
    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every event, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }
}

impl Drop for EventSet {
    fn drop(&mut self) {
        if self.events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.events);
        let Ok(handle) = Handle::try_current() else {
            warn!(count = events.len(), "no runtime to release modules on");
            return;
        };
        let release = async move {
            for event in events.into_values() {
                if let Err(err) = event.module.close().await {
                    warn!(event = %event.id, error = %err, "error releasing module");
                }
            }
        };
        match &self.releases {
            Some(releases) => releases.spawn_on(release, &handle),
            None => {
                handle.spawn(release);
            }
        }
    }
}

/// Worker bound to one (tenant, package, queue).
pub struct Process {
    package_id: String,
    tenant: String,
    queue: String,
    events: Arc<EventSet>,
    queue_client: Arc<dyn QueueClient>,
    exec_timeout: Duration,
}

impl Process {
    /// Create a process draining `queue` and dispatching into `events`.
    pub fn new(
        tenant: impl Into<String>,
        package_id: impl Into<String>,
        queue: impl Into<String>,
        events: Arc<EventSet>,
        queue_client: Arc<dyn QueueClient>,
        exec_timeout: Duration,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            tenant: tenant.into(),
            queue: queue.into(),
            events,
            queue_client,
            exec_timeout,
        }
    }

    /// Scheduler key of this process.
    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(&self.tenant, &self.package_id, &self.queue)
    }

    /// Tenant id.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Package id.
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Queue drained by this process.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The package's events.
    pub fn events(&self) -> &Arc<EventSet> {
        &self.events
    }

    /// Drain one dequeue worth of items.
    ///
    /// Nothing here fails the tick: every failure is logged and the next
    /// scheduled tick retries naturally.
    pub async fn process_events(&self) {
        let items = match self.queue_client.dequeue(&self.tenant, &self.queue).await {
            Ok(items) => items,
            Err(err) => {
                warn!(tenant = %self.tenant, queue = %self.queue, error = %err, "error dequeuing");
                return;
            }
        };
        if items.is_empty() {
            return;
        }
        debug!(tenant = %self.tenant, queue = %self.queue, count = items.len(), "dequeued items");
        for item in items {
            self.process_item(item).await;
        }
    }

    async fn process_item(&self, item: QueueItem) {
        let Some(event) = self.events.get(&item.event) else {
            warn!(tenant = %self.tenant, queue = %self.queue, event = %item.event, "event not supported");
            return;
        };
        // A failed run still reports and routes, with code 0 and the failure as
        // the recorded message.
        let (code, result) = match module::run(&event.module, &item.data, self.exec_timeout).await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(tenant = %self.tenant, event = %event.id, error = %err, "error executing");
                (NO_ERROR, err.to_string())
            }
        };
        if let Err(err) = event.log_sender.send_result(&self.queue, code, &result).await {
            error!(tenant = %self.tenant, event = %event.id, error = %err, "error reporting to recorder");
        }
        if let Err(err) = self.make_decisions(&self.tenant, code, &event.next_step).await {
            error!(tenant = %self.tenant, event = %event.id, error = %err, "error enqueuing the result");
        }
    }

    /// Route an outcome: code 0 goes to `result_def.ok`, anything else to
    /// `result_def.error`.
    pub async fn make_decisions(
        &self,
        tenant: &str,
        code: u64,
        result_def: &ResultDef,
    ) -> Result<(), ExecutorError> {
        let payload = serde_json::to_vec(&JobResult {
            kind: JobResultKind::Result,
            code,
            message: String::new(),
        })?;
        let target = result_def.target(code);
        self.queue_client
            .enqueue(
                tenant,
                &target.supplier_queue,
                vec![QueueItem::new(target.id.clone(), payload)],
            )
            .await
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("tenant", &self.tenant)
            .field("package_id", &self.package_id)
            .field("queue", &self.queue)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}
