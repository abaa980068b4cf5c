//! Lease Cache - A persistent key/value cache with expiring stores and entries
//!
//! Each named store carries a lease fixed when the store is created; once it
//! runs out the whole store is discarded the next time the cache starts.
//! Individual entries may also carry their own lifetime.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, EntryOptions};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use tasks::spawn_initialize_task;
