//! Store Lifecycle Module
//!
//! Opens the persistent store at startup and enforces the store-level lease.
//!
//! The lease end is written once, when the store is created, under
//! [`STORE_EXPIRATION_KEY`]. Reattaching before that instant reuses the store
//! and leaves the record untouched; reattaching at or after it drops the store
//! with every entry and starts a fresh one. The whole check runs under the
//! engine's lease lock for the store name, so two managers opening the same
//! store cannot interleave a drop with the other's attach.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{Clock, STORE_EXPIRATION_KEY};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::storage::{StorageEngine, Store};

// == Lease Outcome ==
/// What `open_store` did to obtain the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// No lease record existed; one was written
    Created,
    /// The existing lease was still running; the store was reused as-is
    Reused,
    /// The lease had run out; the store was dropped and recreated
    Replaced,
}

/// State of the Store Expiration Record as read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseRecord {
    Missing,
    ExpiresAt(u64),
    Unreadable,
}

/// Reads the Store Expiration Record of `store`.
pub async fn read_store_expiration(store: &dyn Store) -> Result<Option<u64>> {
    Ok(match read_lease(store).await? {
        LeaseRecord::ExpiresAt(at) => Some(at),
        LeaseRecord::Missing | LeaseRecord::Unreadable => None,
    })
}

async fn read_lease(store: &dyn Store) -> Result<LeaseRecord> {
    Ok(match store.get(STORE_EXPIRATION_KEY).await? {
        None | Some(Value::Null) => LeaseRecord::Missing,
        Some(record) => match record.as_u64() {
            Some(at) => LeaseRecord::ExpiresAt(at),
            None => LeaseRecord::Unreadable,
        },
    })
}

/// Writes the Store Expiration Record of `store`.
pub async fn write_store_expiration(store: &dyn Store, expires_at_ms: u64) -> Result<()> {
    store
        .set(STORE_EXPIRATION_KEY, Value::from(expires_at_ms))
        .await
}

// == Open Store ==
/// Creates or reattaches the configured store, honouring its lease.
///
/// # Returns
/// The ready handle and what had to be done to obtain it.
pub async fn open_store(
    engine: &dyn StorageEngine,
    config: &CacheConfig,
    clock: &dyn Clock,
) -> Result<(Arc<dyn Store>, LeaseOutcome)> {
    let name = config.store_name.as_str();
    let _lease = engine.lease_lock(name).await;
    let store = engine.create_or_attach(name).await?;
    let record = read_lease(store.as_ref()).await?;

    let now = clock.now_ms();
    let expiration = now.saturating_add(config.lease_ms());

    match record {
        LeaseRecord::Missing => {
            write_store_expiration(store.as_ref(), expiration).await?;
            info!(
                store = name,
                engine = engine.name(),
                expires_at_ms = expiration,
                "Created cache store"
            );
            Ok((store, LeaseOutcome::Created))
        }
        LeaseRecord::ExpiresAt(recorded) if now < recorded => {
            info!(
                store = name,
                engine = engine.name(),
                expires_at_ms = recorded,
                remaining_ms = recorded - now,
                "Reusing cache store"
            );
            Ok((store, LeaseOutcome::Reused))
        }
        expired => {
            if expired == LeaseRecord::Unreadable {
                warn!(store = name, "Store expiration record is unreadable; treating store as expired");
            }
            drop(store);
            engine.drop_store(name).await?;

            let store = engine.create_or_attach(name).await?;
            write_store_expiration(store.as_ref(), expiration).await?;
            info!(
                store = name,
                engine = engine.name(),
                expires_at_ms = expiration,
                "Cache store lease ran out; dropped and recreated store"
            );
            Ok((store, LeaseOutcome::Replaced))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheManager, ManualClock};
    use crate::storage::MemoryEngine;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::OwnedMutexGuard;

    /// Shares a `MemoryEngine` but takes its time dropping stores.
    #[derive(Debug, Clone)]
    struct SlowDropEngine {
        inner: MemoryEngine,
    }

    #[async_trait]
    impl StorageEngine for SlowDropEngine {
        fn name(&self) -> &'static str {
            "slow-drop"
        }

        async fn create_or_attach(&self, name: &str) -> Result<Arc<dyn Store>> {
            self.inner.create_or_attach(name).await
        }

        async fn drop_store(&self, name: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.drop_store(name).await
        }

        async fn lease_lock(&self, name: &str) -> OwnedMutexGuard<()> {
            self.inner.lease_lock(name).await
        }
    }

    #[tokio::test]
    async fn test_first_open_writes_lease() {
        let engine = MemoryEngine::new();
        let clock = ManualClock::new(1_000);
        let config = CacheConfig::with_lease_ms(500);

        let (store, outcome) = open_store(&engine, &config, &clock).await.unwrap();

        assert_eq!(outcome, LeaseOutcome::Created);
        assert_eq!(read_store_expiration(store.as_ref()).await.unwrap(), Some(1_500));
    }

    #[tokio::test]
    async fn test_default_lease_is_24h() {
        let engine = MemoryEngine::new();
        let clock = ManualClock::new(0);

        let (store, _) = open_store(&engine, &CacheConfig::default(), &clock)
            .await
            .unwrap();
        assert_eq!(
            read_store_expiration(store.as_ref()).await.unwrap(),
            Some(86_400_000)
        );
    }

    #[tokio::test]
    async fn test_reuse_keeps_entries_and_lease() {
        let engine = MemoryEngine::new();
        let clock = ManualClock::new(0);
        let config = CacheConfig::with_lease_ms(10);

        let (store, _) = open_store(&engine, &config, &clock).await.unwrap();
        store.set("k", json!("v")).await.unwrap();

        clock.set(9);
        let (store, outcome) = open_store(&engine, &config, &clock).await.unwrap();

        assert_eq!(outcome, LeaseOutcome::Reused);
        assert_eq!(store.get("k").await.unwrap(), Some(json!("v")));
        // Reuse does not extend the lease
        assert_eq!(read_store_expiration(store.as_ref()).await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_expired_lease_replaces_store() {
        let engine = MemoryEngine::new();
        let clock = ManualClock::new(0);
        let config = CacheConfig::with_lease_ms(10);

        let (store, _) = open_store(&engine, &config, &clock).await.unwrap();
        store.set("k", json!("v")).await.unwrap();

        clock.set(10);
        let (store, outcome) = open_store(&engine, &config, &clock).await.unwrap();

        assert_eq!(outcome, LeaseOutcome::Replaced);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(read_store_expiration(store.as_ref()).await.unwrap(), Some(20));
    }

    #[tokio::test]
    async fn test_unreadable_lease_replaces_store() {
        let engine = MemoryEngine::new();
        let clock = ManualClock::new(0);
        let config = CacheConfig::with_lease_ms(10);

        let store = engine.create_or_attach(&config.store_name).await.unwrap();
        store.set(STORE_EXPIRATION_KEY, json!("soon")).await.unwrap();
        store.set("k", json!(1)).await.unwrap();

        let (store, outcome) = open_store(&engine, &config, &clock).await.unwrap();
        assert_eq!(outcome, LeaseOutcome::Replaced);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_expired_opens_keep_later_writes() {
        let engine = MemoryEngine::new();
        let clock = ManualClock::new(10);
        let config = CacheConfig::with_lease_ms(100);

        let seeded = engine.create_or_attach(&config.store_name).await.unwrap();
        write_store_expiration(seeded.as_ref(), 10).await.unwrap();
        seeded.set("stale", json!(1)).await.unwrap();

        let slow = CacheManager::with_clock(
            Arc::new(SlowDropEngine { inner: engine.clone() }),
            config.clone(),
            Arc::new(clock.clone()),
        );
        let fast = CacheManager::with_clock(
            Arc::new(engine.clone()),
            config.clone(),
            Arc::new(clock.clone()),
        );

        let (slow_result, _) = tokio::join!(slow.initialize(), async {
            fast.initialize().await.unwrap();
            fast.set_item("k", "fresh", None).await.unwrap();
        });
        slow_result.unwrap();

        // Whichever manager replaced the store, the entry written afterwards survives
        let value: Option<String> = fast.get_item("k").await.unwrap();
        assert_eq!(value.as_deref(), Some("fresh"));
        assert_eq!(fast.store_expiration().await.unwrap(), Some(110));
    }
}
