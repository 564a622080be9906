//! Cache Entry Module
//!
//! Defines the structure for individual memory-tier entries with TTL support.

use std::time::Duration;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read or write (Unix milliseconds)
    pub last_access_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Encoded size reported by the caller, 0 when unknown
    pub size_bytes: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry created at `now_ms` with optional TTL.
    pub fn new(
        key: String,
        value: V,
        now_ms: u64,
        ttl: Option<Duration>,
        size_bytes: usize,
    ) -> Self {
        Self {
            key,
            value,
            created_at: now_ms,
            last_access_at: now_ms,
            expires_at: ttl.map(|ttl| now_ms.saturating_add(ttl.as_millis() as u64)),
            size_bytes,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry stays live for its whole TTL and expires once strictly more
    /// than the TTL has elapsed since creation.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms > expires,
            None => false,
        }
    }

    // == Touch ==
    pub fn touch(&mut self, now_ms: u64) {
        self.last_access_at = now_ms;
    }
}
