//! In-memory storage engine.
//!
//! Stores are shared through the engine: every clone of a `MemoryEngine` and
//! every handle it hands out sees the same namespaces, the way two cache
//! managers in one process share a named browser store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{OwnedMutexGuard, RwLock};

use super::{LeaseLocks, StorageEngine, Store};
use crate::cache::RESERVED_KEY_PREFIX;
use crate::error::Result;

type Namespaces = HashMap<String, HashMap<String, Value>>;

// == Memory Engine ==
/// Storage engine keeping every named store in a shared map.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    stores: Arc<RwLock<Namespaces>>,
    leases: LeaseLocks,
}

impl MemoryEngine {
    /// Creates an engine with no stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a store with this name currently exists.
    pub async fn contains_store(&self, name: &str) -> bool {
        self.stores.read().await.contains_key(name)
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_or_attach(&self, name: &str) -> Result<Arc<dyn Store>> {
        self.stores
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(Arc::new(MemoryStore {
            name: name.to_string(),
            stores: Arc::clone(&self.stores),
        }))
    }

    async fn drop_store(&self, name: &str) -> Result<()> {
        self.stores.write().await.remove(name);
        Ok(())
    }

    async fn lease_lock(&self, name: &str) -> OwnedMutexGuard<()> {
        self.leases.acquire(name).await
    }
}

// == Memory Store ==
/// Handle to one namespace of a `MemoryEngine`.
///
/// The handle addresses its namespace by name, so it keeps working after the
/// store is dropped and recreated under the same name.
#[derive(Debug)]
struct MemoryStore {
    name: String,
    stores: Arc<RwLock<Namespaces>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let stores = self.stores.read().await;
        Ok(stores
            .get(&self.name)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.stores
            .write()
            .await
            .entry(self.name.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if let Some(records) = self.stores.write().await.get_mut(&self.name) {
            records.retain(|key, _| key.starts_with(RESERVED_KEY_PREFIX));
        }
        Ok(())
    }
}
