//! On-disk storage engine.
//!
//! Each named store is a single JSON document `<root>/<name>.json` mapping keys
//! to records, so stores survive process restarts. Writes go to a temporary
//! file that is renamed over the document.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{LeaseLocks, StorageEngine, Store};
use crate::cache::RESERVED_KEY_PREFIX;
use crate::error::{CacheError, Result};

type Records = BTreeMap<String, Value>;

// == File Engine ==
/// Storage engine persisting each named store as a JSON file.
#[derive(Debug, Clone)]
pub struct FileEngine {
    root: PathBuf,
    /// Serializes read-modify-write cycles across every handle of this engine
    lock: Arc<Mutex<()>>,
    leases: LeaseLocks,
}

impl FileEngine {
    /// Creates an engine rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Arc::new(Mutex::new(())),
            leases: LeaseLocks::new(),
        }
    }

    fn store_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(CacheError::Storage(format!("Invalid store name: {:?}", name)));
        }
        Ok(self.root.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl StorageEngine for FileEngine {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn create_or_attach(&self, name: &str) -> Result<Arc<dyn Store>> {
        let path = self.store_path(name)?;
        fs::create_dir_all(&self.root).await?;
        debug!(store = name, path = ?path, "Attached file store");

        Ok(Arc::new(FileStore {
            path,
            lock: Arc::clone(&self.lock),
        }))
    }

    async fn drop_store(&self, name: &str) -> Result<()> {
        let path = self.store_path(name)?;
        let _guard = self.lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn lease_lock(&self, name: &str) -> OwnedMutexGuard<()> {
        self.leases.acquire(name).await
    }
}

// == File Store ==
#[derive(Debug)]
struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    async fn load(&self) -> Result<Records> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                CacheError::Storage(format!("Corrupt store file {}: {}", self.path.display(), e))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Records::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, records: &Records) -> Result<()> {
        let bytes = serde_json::to_vec(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        Ok(records.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(key.to_string(), value);
        self.persist(&records).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.retain(|key, _| key.starts_with(RESERVED_KEY_PREFIX));
        self.persist(&records).await
    }
}
