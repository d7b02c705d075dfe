//! Recorder adapter: turns execution outcomes and guest log lines into
//! [`JobExecution`] records.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::client::RecorderClient;
use crate::core::error::ExecutorError;
use crate::core::model::{JobExecution, JobResult, JobResultKind};
use crate::core::module::{LogSink, ModuleId};
use crate::util::{clock, host};

/// Recorder-backed sender bound to one (tenant, event).
#[derive(Clone)]
pub struct RecorderSender {
    recorder: Arc<dyn RecorderClient>,
    tenant: String,
    event: String,
}

impl RecorderSender {
    /// Create a sender for records of `event` under `tenant`.
    pub fn new(
        recorder: Arc<dyn RecorderClient>,
        tenant: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            recorder,
            tenant: tenant.into(),
            event: event.into(),
        }
    }

    /// Record the outcome of one execution against `queue`.
    pub async fn send_result(
        &self,
        queue: &str,
        code: u64,
        result: &str,
    ) -> Result<(), ExecutorError> {
        let ex = self.execution(queue, JobResultKind::Result, code, result);
        self.recorder.add_execution(ex).await
    }

    /// Record a log line emitted by guest code.
    pub async fn send_log(&self, level: u32, message: &str) -> Result<(), ExecutorError> {
        let ex = self.execution("", JobResultKind::Log, u64::from(level), message);
        self.recorder.add_execution(ex).await
    }

    fn execution(&self, queue: &str, kind: JobResultKind, code: u64, message: &str) -> JobExecution {
        tracing::trace!(
            tenant = %self.tenant,
            event = %self.event,
            kind = kind.description(),
            code,
            "recording execution"
        );
        JobExecution {
            event: self.event.clone(),
            tenant: self.tenant.clone(),
            queue: queue.to_string(),
            date: clock::now(),
            server: host::hostname().to_string(),
            result: JobResult {
                kind,
                code,
                message: message.to_string(),
            },
        }
    }
}

impl std::fmt::Debug for RecorderSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderSender")
            .field("tenant", &self.tenant)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LogSink for RecorderSender {
    async fn log(&self, module: ModuleId, level: u32, message: String) -> Result<(), ExecutorError> {
        // 0 debug, 1 info, 2 warn, anything higher is an error.
        match level {
            0 => tracing::debug!(module, event = %self.event, "{message}"),
            1 => tracing::info!(module, event = %self.event, "{message}"),
            2 => tracing::warn!(module, event = %self.event, "{message}"),
            3.. => tracing::error!(module, event = %self.event, "{message}"),
        }
        self.send_log(level, &message).await
    }
}
