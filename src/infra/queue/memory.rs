//! In-memory queue service with FIFO order per (tenant, queue).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{ExecutorError, QueueClient, QueueItem};

/// Items handed out per dequeue unless configured otherwise.
pub const DEFAULT_DEQUEUE_BATCH: usize = 1;
/// Upper bound on items handed out per dequeue.
pub const MAX_DEQUEUE_BATCH: usize = 100;

type QueueKey = (String, String);

/// In-memory queue service for development and tests.
#[derive(Debug)]
pub struct MemQueue {
    queues: Mutex<HashMap<QueueKey, VecDeque<QueueItem>>>,
    batch: usize,
    unavailable: AtomicBool,
    dequeue_calls: AtomicU64,
}

impl Default for MemQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemQueue {
    /// Create an empty service handing out one item per dequeue.
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            batch: DEFAULT_DEQUEUE_BATCH,
            unavailable: AtomicBool::new(false),
            dequeue_calls: AtomicU64::new(0),
        }
    }

    /// Hand out up to `batch` items per dequeue, capped at [`MAX_DEQUEUE_BATCH`].
    #[must_use]
    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch.clamp(1, MAX_DEQUEUE_BATCH);
        self
    }

    /// Append an item without going through the client trait.
    pub fn push(&self, tenant: &str, queue: &str, item: QueueItem) {
        self.queues
            .lock()
            .entry((tenant.to_string(), queue.to_string()))
            .or_default()
            .push_back(item);
    }

    /// Items currently held by a queue, oldest first.
    pub fn items(&self, tenant: &str, queue: &str) -> Vec<QueueItem> {
        self.queues
            .lock()
            .get(&(tenant.to_string(), queue.to_string()))
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of items held by a queue.
    pub fn len(&self, tenant: &str, queue: &str) -> usize {
        self.queues
            .lock()
            .get(&(tenant.to_string(), queue.to_string()))
            .map_or(0, VecDeque::len)
    }

    /// Make every call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of dequeue calls served or refused so far.
    pub fn dequeue_calls(&self) -> u64 {
        self.dequeue_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ExecutorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ExecutorError::Queue("queue service unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueClient for MemQueue {
    async fn dequeue(&self, tenant: &str, queue: &str) -> Result<Vec<QueueItem>, ExecutorError> {
        self.dequeue_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut queues = self.queues.lock();
        let Some(q) = queues.get_mut(&(tenant.to_string(), queue.to_string())) else {
            return Ok(Vec::new());
        };
        let n = q.len().min(self.batch);
        Ok(q.drain(..n).collect())
    }

    async fn enqueue(
        &self,
        tenant: &str,
        queue: &str,
        items: Vec<QueueItem>,
    ) -> Result<(), ExecutorError> {
        self.check_available()?;
        self.queues
            .lock()
            .entry((tenant.to_string(), queue.to_string()))
            .or_default()
            .extend(items);
        Ok(())
    }
}
