//! Core executor: scheduler, processes, module boundary and reconciliation.

pub mod client;
pub mod error;
pub mod executor;
pub mod model;
pub mod module;
pub mod process;
pub mod recorder;
pub mod scheduler;
pub mod ticker;

pub use client::{CatalogClient, Clients, QueueClient, RecorderClient, RepoClient, UpdateStream};
pub use error::{AppResult, ErrorSet, ExecutorError};
pub use executor::Executor;
pub use model::{
    EventDef, JobDef, JobExecution, JobResult, JobResultKind, Package, PackageUpdate, QueueDef,
    QueueItem, ResultDef, RuntimeDef, UpdateKind, NO_ERROR,
};
pub use module::{LogSink, Module, ModuleHandle, ModuleId, ModuleRuntime};
pub use process::{Event, EventSet, ModuleReleases, Process};
pub use recorder::RecorderSender;
pub use scheduler::{ProcessKey, ProcessMap, Scheduler, Status, DEFAULT_MAX_EXECUTORS};
pub use ticker::{IntervalTicker, ManualTicker, TickHandle, Ticker};
