//! In-memory, append-only recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{ExecutorError, JobExecution, JobResultKind, RecorderClient};

/// Append-only execution log for development and tests.
#[derive(Debug, Default)]
pub struct MemRecorder {
    records: Mutex<Vec<JobExecution>>,
    unavailable: AtomicBool,
}

impl MemRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, oldest first.
    pub fn records(&self) -> Vec<JobExecution> {
        self.records.lock().clone()
    }

    /// Records of one kind, oldest first.
    pub fn records_of(&self, kind: JobResultKind) -> Vec<JobExecution> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.result.kind == kind)
            .cloned()
            .collect()
    }

    /// Latest `limit` records of a tenant, oldest first.
    pub fn tail(&self, tenant: &str, limit: usize) -> Vec<JobExecution> {
        let records = self.records.lock();
        let matching: Vec<_> = records.iter().filter(|r| r.tenant == tenant).collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Make every call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecorderClient for MemRecorder {
    async fn add_execution(&self, execution: JobExecution) -> Result<(), ExecutorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ExecutorError::Recorder("recorder unavailable".into()));
        }
        self.records.lock().push(execution);
        Ok(())
    }
}
