//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::{DEFAULT_STORE_LEASE_MS, DEFAULT_STORE_NAME};

// == Cache Config ==
/// Configuration for a single cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Name of the persistent store the manager attaches to
    pub store_name: String,
    /// Store lease in milliseconds, applied when the store is (re)created.
    /// `None` falls back to 24 hours.
    pub expire_cache_after_ms: Option<u64>,
}

impl CacheConfig {
    /// Creates a config for the default store with the given lease.
    pub fn with_lease_ms(expire_cache_after_ms: u64) -> Self {
        Self {
            expire_cache_after_ms: Some(expire_cache_after_ms),
            ..Self::default()
        }
    }

    /// Returns the effective store lease in milliseconds.
    pub fn lease_ms(&self) -> u64 {
        self.expire_cache_after_ms.unwrap_or(DEFAULT_STORE_LEASE_MS)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            expire_cache_after_ms: None,
        }
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache manager settings
    pub cache: CacheConfig,
    /// Directory holding the on-disk stores
    pub cache_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_NAME` - Persistent store name (default: LEASE_CACHE)
    /// - `STORE_TTL_MS` - Store lease in milliseconds (default: 86400000)
    /// - `CACHE_DIR` - Directory for on-disk stores (default: ./lease_cache_data)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig {
                store_name: env::var("STORE_NAME")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or(defaults.cache.store_name),
                expire_cache_after_ms: env::var("STORE_TTL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .or(defaults.cache.expire_cache_after_ms),
            },
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            cache_dir: PathBuf::from("./lease_cache_data"),
            server_port: 3000,
        }
    }
}
