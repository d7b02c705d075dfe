//! Sandboxed module boundary.
//!
//! A [`Module`] is one instantiated guest function. Guest calls are not
//! reentrant, so every module sits behind a [`ModuleHandle`] that serializes
//! calls and refuses to close while a call is in flight.
//!
//! The runtime behind these traits owns buffer marshaling: memory it allocates
//! in the guest for a call is freed before [`Module::run`] returns, whether the
//! call succeeded or not.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::error::ExecutorError;

/// Numeric module identity, passed to the guest and echoed back on log calls.
pub type ModuleId = u32;

/// Receiver of log lines emitted by guest code.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Handle one log line at the guest-supplied level.
    async fn log(&self, module: ModuleId, level: u32, message: String) -> Result<(), ExecutorError>;
}

/// One compiled, invocable guest function.
#[async_trait]
pub trait Module: Send {
    /// Invoke the entry function, returning the guest's code and result string.
    async fn run(&mut self, id: ModuleId, data: &str) -> Result<(u64, String), ExecutorError>;

    /// Release the instance.
    async fn close(&mut self) -> Result<(), ExecutorError>;
}

/// Compiles and instantiates modules.
#[async_trait]
pub trait ModuleRuntime: Send + Sync {
    /// Instantiate `bytes` with `entry` as the function invoked per item.
    async fn new_module(
        &self,
        name: &str,
        bytes: &[u8],
        entry: &str,
        log: Arc<dyn LogSink>,
    ) -> Result<Box<dyn Module>, ExecutorError>;

    /// Shut the runtime down.
    async fn close(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Exclusive owner of one [`Module`].
pub struct ModuleHandle {
    id: ModuleId,
    name: String,
    slot: Mutex<Option<Box<dyn Module>>>,
}

impl ModuleHandle {
    /// Wrap a freshly instantiated module.
    pub fn new(id: ModuleId, name: impl Into<String>, module: Box<dyn Module>) -> Self {
        Self {
            id,
            name: name.into(),
            slot: Mutex::new(Some(module)),
        }
    }

    /// Numeric identity.
    pub const fn id(&self) -> ModuleId {
        self.id
    }

    /// Human readable identity used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the module; waits for any call already in flight.
    pub async fn call(&self, data: &str) -> Result<(u64, String), ExecutorError> {
        let mut slot = self.slot.lock().await;
        let module = slot
            .as_mut()
            .ok_or_else(|| ExecutorError::ModuleClosed(self.name.clone()))?;
        module.run(self.id, data).await
    }

    /// Close the module once any in-flight call finishes. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), ExecutorError> {
        let mut slot = self.slot.lock().await;
        match slot.take() {
            Some(mut module) => module.close().await,
            None => Ok(()),
        }
    }

    /// Whether the module has been closed.
    pub async fn is_closed(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Execute one item against a module under `timeout`.
///
/// Failures come back wrapped with the module's identity.
pub async fn run(
    module: &ModuleHandle,
    data: &[u8],
    timeout: Duration,
) -> Result<(u64, String), ExecutorError> {
    let data = String::from_utf8_lossy(data);
    let outcome = tokio::time::timeout(timeout, module.call(&data)).await;
    match outcome {
        Err(_) => Err(ExecutorError::ModuleTimeout {
            module: module.name().to_string(),
            after: timeout,
        }),
        Ok(Err(err)) => Err(wrap(module, err)),
        Ok(Ok((code, result))) => {
            tracing::debug!(module = module.name(), code, result = %result, "module returned");
            Ok((code, result))
        }
    }
}

fn wrap(module: &ModuleHandle, err: ExecutorError) -> ExecutorError {
    match err {
        err @ (ExecutorError::Module { .. }
        | ExecutorError::ModuleTimeout { .. }
        | ExecutorError::ModuleClosed(_)) => err,
        other => ExecutorError::Module {
            module: module.name().to_string(),
            reason: other.to_string(),
        },
    }
}
