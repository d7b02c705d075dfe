//! Module runtime backed by registered Rust closures.
//!
//! Module bytes are read as a UTF-8 key; the pair (key, entry function) selects
//! the closure that stands in for the guest. Closures talk back to the host
//! through a [`Guest`], which buffers log lines and an optional simulated run
//! time.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::core::{ExecutorError, LogSink, Module, ModuleId, ModuleRuntime};

/// Guest function stand-in.
pub type Handler = Arc<dyn Fn(&mut Guest, &str) -> Result<(u64, String), String> + Send + Sync>;

/// Host view handed to a [`Handler`] for one call.
#[derive(Debug, Default)]
pub struct Guest {
    logs: Vec<(u32, String)>,
    busy: Option<Duration>,
}

impl Guest {
    /// Emit a log line at `level` (0 debug, 1 info, 2 warn, 3 error).
    pub fn log(&mut self, level: u32, message: impl Into<String>) {
        self.logs.push((level, message.into()));
    }

    /// Keep the call in flight for `duration` before returning.
    pub fn busy_for(&mut self, duration: Duration) {
        self.busy = Some(duration);
    }
}

#[derive(Default)]
struct Counters {
    instances: AtomicUsize,
    closed: AtomicUsize,
    open_at_close: RwLock<Option<usize>>,
}

/// Runtime resolving modules to registered closures.
#[derive(Default)]
pub struct FnRuntime {
    handlers: RwLock<HashMap<(String, String), Handler>>,
    counters: Arc<Counters>,
}

impl FnRuntime {
    /// Create a runtime with no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as the `entry` function of the module whose bytes
    /// are `module`.
    pub fn register<F>(&self, module: &str, entry: &str, handler: F)
    where
        F: Fn(&mut Guest, &str) -> Result<(u64, String), String> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .insert((module.to_string(), entry.to_string()), Arc::new(handler));
    }

    /// Modules instantiated so far.
    pub fn instances(&self) -> usize {
        self.counters.instances.load(Ordering::SeqCst)
    }

    /// Modules closed so far.
    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Modules still open when the runtime was closed; `None` while it is open.
    pub fn open_at_close(&self) -> Option<usize> {
        *self.counters.open_at_close.read()
    }
}

impl fmt::Debug for FnRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRuntime")
            .field("functions", &self.handlers.read().len())
            .field("instances", &self.instances())
            .field("closed", &self.closed())
            .finish()
    }
}

#[async_trait]
impl ModuleRuntime for FnRuntime {
    async fn new_module(
        &self,
        name: &str,
        bytes: &[u8],
        entry: &str,
        log: Arc<dyn LogSink>,
    ) -> Result<Box<dyn Module>, ExecutorError> {
        let key = std::str::from_utf8(bytes).map_err(|e| ExecutorError::Module {
            module: name.to_string(),
            reason: format!("invalid module: {e}"),
        })?;
        let handler = self
            .handlers
            .read()
            .get(&(key.to_string(), entry.to_string()))
            .cloned()
            .ok_or_else(|| ExecutorError::Module {
                module: name.to_string(),
                reason: format!("entry function {entry} not exported by {key}"),
            })?;
        self.counters.instances.fetch_add(1, Ordering::SeqCst);
        debug!(module = name, entry, "module instantiated");
        Ok(Box::new(FnModule {
            handler,
            log,
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn close(&self) -> Result<(), ExecutorError> {
        let open = self.instances().saturating_sub(self.closed());
        if open > 0 {
            debug!(open, "runtime closing with modules still open");
        }
        *self.counters.open_at_close.write() = Some(open);
        Ok(())
    }
}

struct FnModule {
    handler: Handler,
    log: Arc<dyn LogSink>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Module for FnModule {
    async fn run(&mut self, id: ModuleId, data: &str) -> Result<(u64, String), ExecutorError> {
        let mut guest = Guest::default();
        let outcome = (self.handler)(&mut guest, data);
        for (level, message) in guest.logs {
            if let Err(err) = self.log.log(id, level, message).await {
                debug!(module = id, error = %err, "dropping guest log line");
            }
        }
        if let Some(busy) = guest.busy {
            tokio::time::sleep(busy).await;
        }
        outcome.map_err(ExecutorError::Runtime)
    }

    async fn close(&mut self) -> Result<(), ExecutorError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
