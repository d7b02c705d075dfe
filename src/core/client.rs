//! Contracts of the remote services the executor depends on.
//!
//! Each trait mirrors one service's call contract. None of the calls take a
//! cancellation token: in-flight calls are never aborted by scheduler shutdown,
//! they finish (or fail) on their own.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::core::error::{ErrorSet, ExecutorError};
use crate::core::model::{JobExecution, Package, PackageUpdate, QueueItem};

/// Stream of catalog changes. Delivery is at-least-once and unordered with
/// respect to the snapshot returned by [`CatalogClient::all_packages`].
pub type UpdateStream = BoxStream<'static, PackageUpdate>;

/// Catalog (control) service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Full snapshot of every deployed package.
    async fn all_packages(&self) -> Result<Vec<Package>, ExecutorError>;

    /// Subscribe to package changes.
    async fn subscribe_updates(&self) -> Result<UpdateStream, ExecutorError>;

    /// Release the connection.
    async fn close(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Queue storage service.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Take zero or more items from a tenant's queue.
    async fn dequeue(&self, tenant: &str, queue: &str) -> Result<Vec<QueueItem>, ExecutorError>;

    /// Append items to a tenant's queue. Errors are surfaced, never retried here.
    async fn enqueue(
        &self,
        tenant: &str,
        queue: &str,
        items: Vec<QueueItem>,
    ) -> Result<(), ExecutorError>;

    /// Release the connection.
    async fn close(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Blob repository service.
#[async_trait]
pub trait RepoClient: Send + Sync {
    /// Fetch a file; missing files are an error.
    async fn get_file(&self, tenant: &str, name: &str) -> Result<Vec<u8>, ExecutorError>;

    /// Release the connection.
    async fn close(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Recorder (execution log) service.
#[async_trait]
pub trait RecorderClient: Send + Sync {
    /// Append one execution record.
    async fn add_execution(&self, execution: JobExecution) -> Result<(), ExecutorError>;

    /// Release the connection.
    async fn close(&self) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// The downstream clients shared by every Process.
#[derive(Clone)]
pub struct Clients {
    /// Catalog service.
    pub catalog: Arc<dyn CatalogClient>,
    /// Queue service.
    pub queue: Arc<dyn QueueClient>,
    /// Repo service.
    pub repo: Arc<dyn RepoClient>,
    /// Recorder service.
    pub recorder: Arc<dyn RecorderClient>,
}

impl Clients {
    /// Bundle the four clients.
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        queue: Arc<dyn QueueClient>,
        repo: Arc<dyn RepoClient>,
        recorder: Arc<dyn RecorderClient>,
    ) -> Self {
        Self {
            catalog,
            queue,
            repo,
            recorder,
        }
    }

    /// Close every client, even when some fail.
    pub async fn close(&self) -> Result<(), ExecutorError> {
        let mut errs = ErrorSet::new();
        errs.collect(self.catalog.close().await);
        errs.collect(self.queue.close().await);
        errs.collect(self.repo.close().await);
        errs.collect(self.recorder.close().await);
        errs.into_result()
    }
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients").finish_non_exhaustive()
    }
}
