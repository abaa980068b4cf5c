//! Storage Module
//!
//! The persistent key/value engine the cache sits on. The cache only relies on
//! the minimal contract below, so any engine implementing it is substitutable.
//!
//! # Engines
//! - `MemoryEngine`: process-wide named namespaces held in memory
//! - `FileEngine`: one JSON document per named store on disk
//!
//! Engines keep their own state consistent for single calls; the lease lock
//! serializes whole lease checks, including drop against attach.

mod file;
mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::Result;

pub use file::FileEngine;
pub use memory::MemoryEngine;

// == Storage Engine ==
/// Creates, reattaches and drops named stores.
#[async_trait]
pub trait StorageEngine: Send + Sync + 'static {
    /// A name for tracing.
    fn name(&self) -> &'static str;

    /// Returns a handle to the store called `name`.
    ///
    /// Creates an empty store when none exists, otherwise reattaches to the
    /// existing one. Must be safe to call repeatedly.
    async fn create_or_attach(&self, name: &str) -> Result<Arc<dyn Store>>;

    /// Irreversibly deletes the store called `name` and every record in it.
    async fn drop_store(&self, name: &str) -> Result<()>;

    /// Takes the lease lock of the store called `name`.
    ///
    /// Holding the guard excludes every other lease check on the same store
    /// through this engine or its clones, so a read-decide-drop-recreate
    /// sequence cannot interleave with another one.
    async fn lease_lock(&self, name: &str) -> OwnedMutexGuard<()>;
}

// == Store ==
/// A live handle to one named store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Returns the raw record under `key`, or `None` if nothing was written.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes `value` under `key`, replacing any previous record.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removes every record whose key lies outside the reserved
    /// `__lease_cache__` namespace. Bookkeeping records survive.
    async fn clear(&self) -> Result<()>;
}

// == Lease Locks ==
/// One async mutex per store name, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct LeaseLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl LeaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and takes the lock of `name`.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lease_lock_excludes_same_name() {
        let locks = LeaseLocks::new();
        let guard = locks.acquire("s").await;

        let waiting = tokio::time::timeout(Duration::from_millis(20), locks.clone().acquire("s")).await;
        assert!(waiting.is_err(), "Second holder should wait");

        drop(guard);
        let _again = locks.acquire("s").await;
    }

    #[tokio::test]
    async fn test_lease_lock_names_are_independent() {
        let locks = LeaseLocks::new();
        let _a = locks.acquire("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(20), locks.acquire("b"))
            .await
            .expect("Different store names should not contend");
    }
}
