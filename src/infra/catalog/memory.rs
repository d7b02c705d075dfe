//! In-memory catalog that broadcasts package changes to subscribers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::warn;

use crate::core::{CatalogClient, ExecutorError, Package, PackageUpdate, UpdateKind, UpdateStream};

/// Buffered updates per subscriber before the slowest one starts lagging.
pub const UPDATE_CAPACITY: usize = 64;

/// Package catalog for development and tests.
#[derive(Debug)]
pub struct MemCatalog {
    packages: RwLock<BTreeMap<(String, String), Package>>,
    updates: Mutex<Option<broadcast::Sender<PackageUpdate>>>,
}

impl Default for MemCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            packages: RwLock::new(BTreeMap::new()),
            updates: Mutex::new(Some(tx)),
        }
    }

    /// Store a package without announcing it.
    pub fn insert(&self, package: Package) {
        self.packages
            .write()
            .insert((package.tenant.clone(), package.id.clone()), package);
    }

    /// Store and announce a new package.
    pub fn add_package(&self, package: Package) {
        self.insert(package.clone());
        self.publish(UpdateKind::New, package);
    }

    /// Replace and announce a package.
    pub fn update_package(&self, package: Package) {
        self.insert(package.clone());
        self.publish(UpdateKind::Update, package);
    }

    /// Drop and announce a package. Returns whether it was stored.
    pub fn delete_package(&self, tenant: &str, id: &str) -> bool {
        let removed = self
            .packages
            .write()
            .remove(&(tenant.to_string(), id.to_string()));
        match removed {
            Some(package) => {
                self.publish(UpdateKind::Delete, package);
                true
            }
            None => false,
        }
    }

    /// Announce a change without touching the stored packages.
    pub fn publish(&self, kind: UpdateKind, package: Package) {
        if let Some(tx) = self.updates.lock().as_ref() {
            // no subscribers yet is fine
            let _ = tx.send(PackageUpdate { kind, package });
        }
    }

    /// Number of live subscriptions.
    pub fn subscribers(&self) -> usize {
        self.updates
            .lock()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

#[async_trait]
impl CatalogClient for MemCatalog {
    async fn all_packages(&self) -> Result<Vec<Package>, ExecutorError> {
        Ok(self.packages.read().values().cloned().collect())
    }

    async fn subscribe_updates(&self) -> Result<UpdateStream, ExecutorError> {
        let rx = self
            .updates
            .lock()
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| ExecutorError::Catalog("catalog closed".into()))?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(update) => return Some((update, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "catalog subscriber lagged, updates dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> Result<(), ExecutorError> {
        self.updates.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(id: &str) -> Package {
        Package {
            id: id.into(),
            tenant: "t1".into(),
            name: id.into(),
            queues: vec![],
            jobs: vec![],
            runtimes: vec![],
        }
    }

    #[tokio::test]
    async fn test_subscriber_sees_changes_in_order() {
        let catalog = MemCatalog::new();
        let mut updates = catalog.subscribe_updates().await.unwrap();
        catalog.add_package(package("p1"));
        catalog.update_package(package("p1"));
        assert!(catalog.delete_package("t1", "p1"));
        assert!(!catalog.delete_package("t1", "p1"));

        let kinds: Vec<_> = vec![
            updates.next().await.unwrap().kind,
            updates.next().await.unwrap().kind,
            updates.next().await.unwrap().kind,
        ];
        assert_eq!(kinds, vec![UpdateKind::New, UpdateKind::Update, UpdateKind::Delete]);
        assert!(catalog.all_packages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_streams() {
        let catalog = MemCatalog::new();
        let mut updates = catalog.subscribe_updates().await.unwrap();
        catalog.close().await.unwrap();
        assert!(updates.next().await.is_none());
        assert!(catalog.subscribe_updates().await.is_err());
    }
}
