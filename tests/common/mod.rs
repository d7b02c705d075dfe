//! Shared fixtures: package builders and a harness wiring an executor to the
//! in-memory collaborators with a hand-driven ticker.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use jobico_executor::builders::ExecutorBuilder;
use jobico_executor::config::ExecutorConfig;
use jobico_executor::core::{
    EventDef, Executor, JobDef, ManualTicker, Package, QueueDef, QueueItem, ResultDef, RuntimeDef,
    TickHandle,
};
use jobico_executor::infra::{FnRuntime, MemCatalog, MemQueue, MemRecorder, MemRepo};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TENANT: &str = "t1";
pub const MODULE_FILE: &str = "echo.wasm";
pub const MODULE_KEY: &str = "echo";

/// Job for `event` fed by `queue`, routing both outcomes back to `queue`.
pub fn job(event: &str, queue: &str, runtime: &str) -> JobDef {
    JobDef {
        event: EventDef::new(event, queue, runtime),
        result: ResultDef {
            ok: EventDef::new(format!("{event}_ok"), queue, ""),
            error: EventDef::new(format!("{event}_error"), queue, ""),
        },
    }
}

pub fn runtime(id: &str, module_ref: &str) -> RuntimeDef {
    RuntimeDef {
        id: id.into(),
        name: id.into(),
        module_ref: module_ref.into(),
        main_func: None,
    }
}

pub fn package(id: &str, queues: &[&str], jobs: Vec<JobDef>) -> Package {
    Package {
        id: id.into(),
        tenant: TENANT.into(),
        name: id.into(),
        queues: queues.iter().map(|q| QueueDef::new(*q, *q)).collect(),
        jobs,
        runtimes: vec![runtime("rt1", MODULE_FILE)],
    }
}

/// Executor plus every collaborator it talks to.
pub struct Harness {
    pub catalog: Arc<MemCatalog>,
    pub queue: Arc<MemQueue>,
    pub repo: Arc<MemRepo>,
    pub recorder: Arc<MemRecorder>,
    pub runtime: Arc<FnRuntime>,
    pub executor: Arc<Executor>,
    pub ticks: TickHandle,
    pub cancel: CancellationToken,
    run: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ExecutorConfig::default(), MemQueue::new())
    }

    pub fn with(config: ExecutorConfig, queue: MemQueue) -> Self {
        let catalog = Arc::new(MemCatalog::new());
        let queue = Arc::new(queue);
        let repo = Arc::new(MemRepo::new());
        let recorder = Arc::new(MemRecorder::new());
        let runtime = Arc::new(FnRuntime::new());
        repo.add_file(TENANT, MODULE_FILE, MODULE_KEY);

        let (ticker, ticks) = ManualTicker::channel();
        let executor = ExecutorBuilder::new()
            .config(config)
            .catalog(catalog.clone())
            .queue(queue.clone())
            .repo(repo.clone())
            .recorder(recorder.clone())
            .runtime(runtime.clone())
            .ticker(ticker)
            .build()
            .expect("build executor");

        Self {
            catalog,
            queue,
            repo,
            recorder,
            runtime,
            executor,
            ticks,
            cancel: CancellationToken::new(),
            run: None,
        }
    }

    /// Register `f` as the default entry function of the test module.
    pub fn on_event<F>(&self, f: F)
    where
        F: Fn(&mut jobico_executor::infra::Guest, &str) -> Result<(u64, String), String>
            + Send
            + Sync
            + 'static,
    {
        self.runtime.register(MODULE_KEY, "event", f);
    }

    /// Load the catalog and start the scheduler loop in the background.
    pub async fn start(&mut self) {
        self.executor
            .init(self.cancel.clone())
            .await
            .expect("init executor");
        let scheduler = Arc::clone(self.executor.scheduler());
        let cancel = self.cancel.clone();
        self.run = Some(tokio::spawn(async move { scheduler.run(cancel).await }));
    }

    /// Fire one tick and wait for the sweep it triggers to finish.
    pub async fn sweep(&self) {
        let mut sweeps = self.executor.scheduler().sweeps();
        assert!(self.ticks.tick().await, "ticker closed");
        tokio::time::timeout(Duration::from_secs(5), sweeps.changed())
            .await
            .expect("sweep did not finish")
            .expect("scheduler gone");
    }

    pub fn push(&self, queue: &str, event: &str, data: &str) {
        self.queue.push(TENANT, queue, QueueItem::new(event, data));
    }

    /// Cancel and wait for the scheduler loop to exit.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(run) = self.run.take() {
            run.await.expect("scheduler task");
        }
    }
}

/// Poll `cond` until it holds or five seconds pass.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
