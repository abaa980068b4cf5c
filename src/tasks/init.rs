//! Cache Initialization Task
//!
//! Background task that opens the cache store once after startup, so the
//! server can answer health checks while the store is still being prepared.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::CacheManager;

/// Spawns a background task that initializes the cache manager.
///
/// Failed attempts are logged and retried after `retry_interval` until one
/// succeeds. Until then every cache route answers "not initialized".
///
/// # Returns
/// A JoinHandle for the spawned task, which can be aborted during shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_initialize_task(state.cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_initialize_task(cache: Arc<CacheManager>, retry_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt: u32 = 1;
        loop {
            match cache.initialize().await {
                Ok(()) => {
                    info!(attempt, "Cache store ready");
                    return;
                }
                Err(err) => {
                    warn!(
                        attempt,
                        error = %err,
                        "Cache initialization failed; retrying in {:?}",
                        retry_interval
                    );
                }
            }

            tokio::time::sleep(retry_interval).await;
            attempt += 1;
        }
    })
}
