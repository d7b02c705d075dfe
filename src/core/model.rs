//! Catalog and wire models consumed by the executor.
//!
//! Packages arrive as immutable snapshots from the catalog service. The
//! executor never mutates them; it derives Events, Modules and Processes from
//! them and throws the derived state away on every update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue id suffix marking a sink that receives successful results.
pub const OK_QUEUE_SUFFIX: &str = "_ok";
/// Queue id suffix marking a sink that receives failed results.
pub const ERROR_QUEUE_SUFFIX: &str = "_error";
/// Return code a module uses to report success.
pub const NO_ERROR: u64 = 0;

/// A queue declared by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDef {
    /// Queue identifier, unique within the tenant.
    pub id: String,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
}

impl QueueDef {
    /// Create a queue definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Whether this queue only receives routed results and must never be polled.
    pub fn is_sink(&self) -> bool {
        self.id.ends_with(OK_QUEUE_SUFFIX) || self.id.ends_with(ERROR_QUEUE_SUFFIX)
    }
}

/// An event declared by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDef {
    /// Event identifier; dequeued items select their event by this id.
    pub id: String,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Queue that receives items for this event.
    pub supplier_queue: String,
    /// Runtime executing this event's job.
    #[serde(default)]
    pub runtime: String,
}

impl EventDef {
    /// Create an event definition bound to a supplier queue and runtime.
    pub fn new(
        id: impl Into<String>,
        supplier_queue: impl Into<String>,
        runtime: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            supplier_queue: supplier_queue.into(),
            runtime: runtime.into(),
        }
    }
}

/// Success/failure routing rule of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDef {
    /// Target when the module returns [`NO_ERROR`].
    pub ok: EventDef,
    /// Target for every other return code.
    pub error: EventDef,
}

impl ResultDef {
    /// Pick the routing target for a return code.
    pub const fn target(&self, code: u64) -> &EventDef {
        if code == NO_ERROR {
            &self.ok
        } else {
            &self.error
        }
    }
}

/// A job: the event it handles and where its outcome goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDef {
    /// Event consumed by the job.
    pub event: EventDef,
    /// Routing rule for the job's outcome.
    pub result: ResultDef,
}

/// A runtime declaration: which module blob to load and which function to call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDef {
    /// Runtime identifier referenced by [`EventDef::runtime`].
    pub id: String,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Name of the module blob in the repo service.
    pub module_ref: String,
    /// Entry function; the configured default applies when absent.
    #[serde(default)]
    pub main_func: Option<String>,
}

/// A tenant's deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package identifier, unique within the tenant.
    pub id: String,
    /// Owning tenant.
    pub tenant: String,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Declared queues, sinks included.
    #[serde(default)]
    pub queues: Vec<QueueDef>,
    /// Declared jobs.
    #[serde(default)]
    pub jobs: Vec<JobDef>,
    /// Declared runtimes.
    #[serde(default)]
    pub runtimes: Vec<RuntimeDef>,
}

impl Package {
    /// Queues that get a polling Process.
    pub fn pollable_queues(&self) -> impl Iterator<Item = &QueueDef> {
        self.queues.iter().filter(|q| !q.is_sink())
    }

    /// Look up a runtime by id.
    pub fn runtime(&self, id: &str) -> Option<&RuntimeDef> {
        self.runtimes.iter().find(|r| r.id == id)
    }
}

/// Kind of catalog change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Package deployed.
    New,
    /// Package redeployed.
    Update,
    /// Package removed.
    Delete,
}

/// A change notification from the catalog stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUpdate {
    /// What happened.
    pub kind: UpdateKind,
    /// The package snapshot after (or, for deletes, before) the change.
    pub package: Package,
}

/// An item held by the queue service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Event id selecting the handler.
    pub event: String,
    /// Opaque payload.
    pub data: Vec<u8>,
}

impl QueueItem {
    /// Create an item.
    pub fn new(event: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Kind of a recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResultKind {
    /// A log line emitted from inside sandboxed code.
    Log,
    /// The outcome of one execution.
    Result,
}

impl JobResultKind {
    /// Short description stored alongside the kind.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Result => "result",
        }
    }
}

/// Outcome payload shared by recorder records and routed queue items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Record kind.
    #[serde(rename = "type")]
    pub kind: JobResultKind,
    /// Return code, or log level for [`JobResultKind::Log`].
    pub code: u64,
    /// Result string or log message.
    #[serde(default)]
    pub message: String,
}

/// One record for the recorder service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    /// Event id.
    pub event: String,
    /// Tenant id.
    pub tenant: String,
    /// Queue the item came from; empty for log records.
    pub queue: String,
    /// When the record was produced.
    pub date: DateTime<Utc>,
    /// Host that produced the record.
    pub server: String,
    /// Outcome.
    pub result: JobResult,
}
