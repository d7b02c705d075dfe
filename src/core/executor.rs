//! Top-level orchestrator: turns catalog snapshots and updates into live
//! Processes.
//!
//! Reconciliation is rebuild-only. A new or updated package has its Processes
//! removed and derived again from the snapshot; nothing is diffed. Because the
//! update stream is subscribed after the initial load, the same package may be
//! announced twice; rebuilding is idempotent per Process key, so duplicates
//! are harmless.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ExecutorConfig;
use crate::core::client::Clients;
use crate::core::error::{ErrorSet, ExecutorError};
use crate::core::model::{Package, PackageUpdate, UpdateKind};
use crate::core::module::{ModuleHandle, ModuleRuntime};
use crate::core::process::{Event, EventSet, ModuleReleases, Process};
use crate::core::recorder::RecorderSender;
use crate::core::scheduler::{Scheduler, Status};
use crate::core::ticker::Ticker;

/// The executor: owns the scheduler, the module runtime and the clients.
pub struct Executor {
    config: ExecutorConfig,
    scheduler: Arc<Scheduler>,
    runtime: Arc<dyn ModuleRuntime>,
    clients: Clients,
    next_module_id: AtomicU32,
    releases: ModuleReleases,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Executor {
    /// Create an executor sweeping on `ticker`.
    pub fn new(
        config: ExecutorConfig,
        clients: Clients,
        runtime: Arc<dyn ModuleRuntime>,
        ticker: Box<dyn Ticker>,
    ) -> Self {
        let scheduler = Arc::new(Scheduler::new(
            ticker,
            config.max_executors,
            config.dispose_timeout(),
        ));
        Self {
            config,
            scheduler,
            runtime,
            clients,
            next_module_id: AtomicU32::new(1),
            releases: ModuleReleases::new(),
            listener: Mutex::new(None),
        }
    }

    /// The scheduler.
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// The downstream clients.
    pub const fn clients(&self) -> &Clients {
        &self.clients
    }

    /// The configuration in use.
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Load every package, then follow catalog updates until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Failing to load the catalog, to build a loaded package, or to subscribe
    /// to updates is fatal.
    pub async fn init(self: &Arc<Self>, cancel: CancellationToken) -> Result<(), ExecutorError> {
        let packages = self.clients.catalog.all_packages().await?;
        for pkg in &packages {
            self.add_executors(pkg).await?;
        }
        info!(packages = packages.len(), "catalog loaded");

        let mut updates = self.clients.catalog.subscribe_updates().await?;
        let this = Arc::clone(self);
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    update = updates.next() => match update {
                        Some(update) => this.on_update(update).await,
                        None => {
                            warn!("catalog update stream closed");
                            break;
                        }
                    },
                }
            }
            debug!("stopped listening for catalog updates");
        });
        let previous = self.listener.lock().replace(listener);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }

    /// [`init`](Self::init), then run the scheduler until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Propagates startup failures from [`init`](Self::init).
    pub async fn start(self: &Arc<Self>, cancel: CancellationToken) -> Result<(), ExecutorError> {
        self.init(cancel.clone()).await?;
        self.scheduler.run(cancel).await;
        Ok(())
    }

    /// Build the Events of `pkg` and register one Process per pollable queue.
    ///
    /// # Errors
    ///
    /// Fails when a module cannot be fetched or instantiated; nothing of the
    /// package is registered in that case.
    pub async fn add_executors(&self, pkg: &Package) -> Result<(), ExecutorError> {
        let mut files: HashMap<&str, Vec<u8>> = HashMap::new();
        let mut events = EventSet::with_releases(self.releases.clone());
        for job in &pkg.jobs {
            let Some(runtime) = pkg.runtime(&job.event.runtime) else {
                warn!(
                    tenant = %pkg.tenant,
                    package = %pkg.id,
                    event = %job.event.id,
                    runtime = %job.event.runtime,
                    "runtime not found, skipping job"
                );
                continue;
            };
            let bytes = match files.entry(runtime.module_ref.as_str()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let bytes = self
                        .clients
                        .repo
                        .get_file(&pkg.tenant, &runtime.module_ref)
                        .await?;
                    e.insert(bytes)
                }
            };
            let entry = runtime
                .main_func
                .as_deref()
                .unwrap_or(self.config.default_entry_func.as_str());
            let name = format!("{}/{}/{}", pkg.tenant, pkg.id, job.event.id);
            let log_sender = RecorderSender::new(
                Arc::clone(&self.clients.recorder),
                pkg.tenant.clone(),
                job.event.id.clone(),
            );
            let module = self
                .runtime
                .new_module(&name, bytes, entry, Arc::new(log_sender.clone()))
                .await?;
            let id = self.next_module_id.fetch_add(1, Ordering::Relaxed);
            events.insert(Event {
                id: job.event.id.clone(),
                next_step: job.result.clone(),
                module: ModuleHandle::new(id, name, module),
                log_sender,
            });
        }

        let events = Arc::new(events);
        let mut registered = 0;
        for queue in pkg.pollable_queues() {
            self.scheduler.add(Arc::new(Process::new(
                pkg.tenant.clone(),
                pkg.id.clone(),
                queue.id.clone(),
                Arc::clone(&events),
                Arc::clone(&self.clients.queue),
                self.config.exec_timeout(),
            )));
            registered += 1;
        }
        info!(
            tenant = %pkg.tenant,
            package = %pkg.id,
            processes = registered,
            events = events.len(),
            "package registered"
        );
        Ok(())
    }

    /// Apply one catalog change.
    pub async fn on_update(&self, update: PackageUpdate) {
        let pkg = &update.package;
        match update.kind {
            UpdateKind::New | UpdateKind::Update => {
                self.remove_executors(pkg);
                if let Err(err) = self.add_executors(pkg).await {
                    error!(
                        tenant = %pkg.tenant,
                        package = %pkg.id,
                        error = %err,
                        "error building package"
                    );
                }
            }
            UpdateKind::Delete => self.remove_executors(pkg),
        }
    }

    /// Unregister every Process of `pkg`, whatever queues it used to have.
    pub fn remove_executors(&self, pkg: &Package) {
        let removed = self
            .scheduler
            .processes()
            .remove_package(&pkg.tenant, &pkg.id);
        if !removed.is_empty() {
            info!(
                tenant = %pkg.tenant,
                package = %pkg.id,
                processes = removed.len(),
                "package removed"
            );
        }
    }

    /// Health signal: the scheduler's run loop is active.
    pub fn is_up(&self) -> bool {
        self.scheduler.status() == Status::Started
    }

    /// Stop listening for updates, close every module, the runtime and the
    /// clients. Modules of replaced packages finish closing before the
    /// runtime does. Every step runs even when an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns every failure, joined.
    pub async fn close(&self) -> Result<(), ExecutorError> {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.abort();
        }
        let mut errs = ErrorSet::new();
        errs.collect(self.scheduler.dispose().await);
        let bound = self.config.dispose_timeout();
        if tokio::time::timeout(bound, self.releases.wait()).await.is_err() {
            errs.push(ExecutorError::Timeout("releasing replaced modules".into()));
        }
        errs.collect(self.runtime.close().await);
        errs.collect(self.clients.close().await);
        errs.into_result()
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
