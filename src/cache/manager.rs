//! Cache Manager Module
//!
//! Ties the store lifecycle, entry envelope and expiration check together
//! behind the public cache API.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::cache::entry::{self, CacheEntry, EntryOptions, Freshness};
use crate::cache::lifecycle;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::{Clock, SystemClock, RESERVED_KEY_PREFIX};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::storage::{StorageEngine, Store};

// == Cache Manager ==
/// A time-bounded key/value cache on top of a persistent storage engine.
///
/// The manager is unusable until [`initialize`](Self::initialize) has
/// completed once; every cache operation before that fails with
/// [`CacheError::NotInitialized`].
pub struct CacheManager {
    engine: Arc<dyn StorageEngine>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    /// Ready store handle; set at most once
    handle: OnceCell<Arc<dyn Store>>,
    stats: StatsRecorder,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager reading time from the system clock.
    pub fn new(engine: Arc<dyn StorageEngine>, config: CacheConfig) -> Self {
        Self::with_clock(engine, config, Arc::new(SystemClock))
    }

    /// Creates a manager with an explicit clock.
    pub fn with_clock(
        engine: Arc<dyn StorageEngine>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            config,
            clock,
            handle: OnceCell::new(),
            stats: StatsRecorder::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Initialize ==
    /// Opens the configured store, dropping and recreating it if its lease
    /// has run out.
    ///
    /// Runs at most once: calls made while an initialization is in flight
    /// wait for it instead of opening the store again, and calls made after
    /// the manager is ready return immediately. A failed attempt leaves the
    /// manager not ready so it can be retried.
    pub async fn initialize(&self) -> Result<()> {
        self.handle
            .get_or_try_init(|| async {
                let (store, _) = lifecycle::open_store(
                    self.engine.as_ref(),
                    &self.config,
                    self.clock.as_ref(),
                )
                .await
                .map_err(|e| self.report("initialize", None, e))?;
                Ok::<_, CacheError>(store)
            })
            .await?;
        Ok(())
    }

    // == Is Ready ==
    /// Returns true once the store handle is available.
    pub fn is_ready(&self) -> bool {
        self.handle.initialized()
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored or the entry has expired;
    /// expired slots are cleared in the background.
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let store = self.handle()?;
        ensure_caller_key(key)?;

        let raw = store
            .get(key)
            .await
            .map_err(|e| self.report("get", Some(key), e))?;

        let freshness = entry::evaluate(raw, self.clock.now_ms())
            .map_err(|e| self.report("get", Some(key), e))?;

        match freshness {
            Freshness::Absent => {
                self.stats.record_miss();
                Ok(None)
            }
            Freshness::Expired => {
                self.stats.record_expiration();
                debug!(key, "Cache entry expired");
                self.spawn_cleanup(Arc::clone(store), key);
                Ok(None)
            }
            Freshness::Fresh(value) => {
                let value =
                    serde_json::from_value(value).map_err(|e| self.report("get", Some(key), e.into()))?;
                self.stats.record_hit();
                Ok(Some(value))
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// # Arguments
    /// * `key` - Caller key; must not use the reserved prefix
    /// * `value` - Any serializable payload
    /// * `options` - Optional per-entry lifetime
    pub async fn set_item<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: Option<EntryOptions>,
    ) -> Result<()> {
        let store = self.handle()?;
        ensure_caller_key(key)?;

        let value = serde_json::to_value(value).map_err(|e| self.report("set", Some(key), e.into()))?;
        let record = CacheEntry::encode(value, options, self.clock.now_ms())
            .into_record()
            .map_err(|e| self.report("set", Some(key), e))?;

        store
            .set(key, record)
            .await
            .map_err(|e| self.report("set", Some(key), e))
    }

    // == Clear ==
    /// Removes every entry from the current store.
    ///
    /// The store lease is kept: the engine clears caller keys only, so the
    /// Store Expiration Record is never removed or rewritten.
    pub async fn clear_cache(&self) -> Result<()> {
        let store = self.handle()?;
        store
            .clear()
            .await
            .map_err(|e| self.report("clear", None, e))?;

        info!(store = %self.config.store_name, "Cache cleared");
        Ok(())
    }

    // == Store Expiration ==
    /// Returns the recorded end of the store lease, in Unix milliseconds.
    pub async fn store_expiration(&self) -> Result<Option<u64>> {
        let store = self.handle()?;
        lifecycle::read_store_expiration(store.as_ref())
            .await
            .map_err(|e| self.report("read lease", None, e))
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn handle(&self) -> Result<&Arc<dyn Store>> {
        self.handle.get().ok_or(CacheError::NotInitialized)
    }

    /// Logs a failed operation and passes the error through.
    fn report(&self, operation: &str, key: Option<&str>, err: CacheError) -> CacheError {
        if matches!(err, CacheError::Storage(_)) {
            self.stats.record_storage_failure();
        }
        error!(
            store = %self.config.store_name,
            operation,
            key = key.unwrap_or_default(),
            error = %err,
            "Cache operation failed"
        );
        err
    }

    /// Overwrites an expired slot with `null` without blocking the caller.
    fn spawn_cleanup(&self, store: Arc<dyn Store>, key: &str) {
        let clock = Arc::clone(&self.clock);
        let key = key.to_string();

        tokio::spawn(async move {
            if let Err(err) = clear_expired_slot(store.as_ref(), &key, clock.as_ref()).await {
                warn!(key = %key, error = %err, "Failed to clean up expired cache entry");
            }
        });
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Re-reads the slot so an entry set after the expired read is left alone.
async fn clear_expired_slot(store: &dyn Store, key: &str, clock: &dyn Clock) -> Result<()> {
    let raw = store.get(key).await?;
    if entry::evaluate(raw, clock.now_ms())? == Freshness::Expired {
        store.set(key, Value::Null).await?;
        debug!(key, "Cleared expired cache entry");
    }
    Ok(())
}

fn ensure_caller_key(key: &str) -> Result<()> {
    if key.starts_with(RESERVED_KEY_PREFIX) {
        return Err(CacheError::ReservedKey(key.to_string()));
    }
    Ok(())
}
