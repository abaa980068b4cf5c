//! Cache Entry Module
//!
//! Defines the persisted envelope wrapped around every cached value and the
//! read-time expiration check.
//!
//! Under the hood each value is stored as `{"value": ..., "options": {...}}` so
//! individual entries can expire independently of their store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// == Entry Options ==
/// Per-call options accepted by `set_item`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOptions {
    /// Lifetime of the entry in milliseconds, counted from the moment it is set.
    /// `None` means the entry never expires on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_ms: Option<u64>,
}

impl EntryOptions {
    pub fn expire_after_ms(ms: u64) -> Self {
        Self {
            expire_after_ms: Some(ms),
        }
    }
}

// == Stored Options ==
/// Options as persisted alongside the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOptions {
    /// Absolute expiration (Unix milliseconds), None = no expiration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<u64>,
}

// == Cache Entry ==
/// The envelope persisted for each caller-visible key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value, opaque to the cache
    pub value: Value,
    /// Expiration metadata
    #[serde(default)]
    pub options: StoredOptions,
}

impl CacheEntry {
    // == Encode ==
    /// Wraps `value` in an envelope, turning a relative lifetime into an
    /// absolute expiration based on `now_ms`.
    pub fn encode(value: Value, options: Option<EntryOptions>, now_ms: u64) -> Self {
        let expires_at_ms = options
            .unwrap_or_default()
            .expire_after_ms
            .map(|ttl| now_ms.saturating_add(ttl));

        Self {
            value,
            options: StoredOptions { expires_at_ms },
        }
    }

    /// Converts the envelope into the raw record handed to the store.
    pub fn into_record(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    // == Decode ==
    /// Unwraps a raw record read from the store.
    ///
    /// A missing record and the `null` marker left behind by expiration cleanup
    /// both decode to `None`.
    pub fn decode(raw: Option<Value>) -> Result<Option<Self>> {
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(record) => Ok(Some(serde_json::from_value(record)?)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// The boundary instant counts as expired: an entry with
    /// `expires_at_ms == now_ms` is no longer valid.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.options.expires_at_ms {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }
}

// == Freshness ==
/// Outcome of evaluating a raw record at read time.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    /// Nothing stored under the key
    Absent,
    /// The entry is valid; carries the stored value
    Fresh(Value),
    /// The entry exists but its own expiration has passed
    Expired,
}

/// Decodes `raw` and decides whether it is still valid at `now_ms`.
pub fn evaluate(raw: Option<Value>, now_ms: u64) -> Result<Freshness> {
    Ok(match CacheEntry::decode(raw)? {
        None => Freshness::Absent,
        Some(entry) if entry.is_expired_at(now_ms) => Freshness::Expired,
        Some(entry) => Freshness::Fresh(entry.value),
    })
}
