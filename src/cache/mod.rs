//! Cache Module
//!
//! Provides the lease cache: a store-level lease enforced when the store is
//! opened, plus independent per-entry expiration checked on every read.

mod clock;
mod entry;
mod lifecycle;
mod manager;
mod stats;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, EntryOptions, StoredOptions};
pub use manager::CacheManager;
pub use stats::CacheStats;

// == Public Constants ==
/// Store name used when none is configured
pub const DEFAULT_STORE_NAME: &str = "LEASE_CACHE";

/// Store lease applied when none is configured (24 hours)
pub const DEFAULT_STORE_LEASE_MS: u64 = 24 * 60 * 60 * 1000;

/// Prefix of every internal bookkeeping key; caller keys may not use it
pub const RESERVED_KEY_PREFIX: &str = "__lease_cache__";

/// Key of the Store Expiration Record
pub const STORE_EXPIRATION_KEY: &str = "__lease_cache__/STORE_EXPIRATION";
