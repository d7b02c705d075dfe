//! In-memory blob repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{ExecutorError, RepoClient};

/// File store keyed by (tenant, name).
#[derive(Debug, Default)]
pub struct MemRepo {
    files: RwLock<HashMap<(String, String), Vec<u8>>>,
    fetches: AtomicU64,
}

impl MemRepo {
    /// Create an empty repo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file, replacing any previous content.
    pub fn add_file(&self, tenant: &str, name: &str, bytes: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert((tenant.to_string(), name.to_string()), bytes.into());
    }

    /// Number of `get_file` calls so far.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoClient for MemRepo {
    async fn get_file(&self, tenant: &str, name: &str) -> Result<Vec<u8>, ExecutorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.files
            .read()
            .get(&(tenant.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ExecutorError::Repo(format!("file {tenant}/{name} not found")))
    }
}
