//! Memory Cache Module
//!
//! First tier: HashMap storage with LRU tracking and lazy TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::stats::utilization_percent;
use crate::cache::{validate_key, CacheEntry, Clock, LruTracker, MemoryStats, SystemClock};
use crate::error::Result;

// == Memory Cache ==
/// Bounded in-process cache with LRU eviction and TTL support.
///
/// Expired entries are not swept proactively; they are dropped when a read
/// notices them or when [`MemoryCache::purge_expired`] runs.
#[derive(Debug)]
pub struct MemoryCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Hit/miss/eviction counters
    stats: MemoryStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL applied by [`MemoryCache::set`]
    default_ttl: Option<Duration>,
    /// Sum of entry sizes
    total_bytes: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> MemoryCache<V> {
    // == Constructor ==
    /// Creates a MemoryCache with specified capacity and default TTL.
    ///
    /// A capacity of zero is raised to one so evict-before-insert always has
    /// room to work with.
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        Self::with_clock(capacity, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, default_ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: MemoryStats::default(),
            capacity: capacity.max(1),
            default_ttl,
            total_bytes: 0,
            clock,
        }
    }

    // == Set ==
    /// Stores a value under the cache's default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> Result<()> {
        let ttl = self.default_ttl;
        self.insert(key.into(), value, ttl, 0)
    }

    /// Stores a value with an explicit TTL (`None` = never expires).
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        self.insert(key.into(), value, ttl, 0)
    }

    // == Insert ==
    /// Stores a value with explicit TTL and a caller-measured size.
    ///
    /// An existing key is replaced in place. A new key arriving at capacity
    /// evicts exactly one entry, the least recently used, before it is added.
    pub fn insert(
        &mut self,
        key: String,
        value: V,
        ttl: Option<Duration>,
        size_bytes: usize,
    ) -> Result<()> {
        validate_key(&key)?;

        let now = self.clock.now_ms();

        if let Some(old) = self.entries.get(&key) {
            self.total_bytes -= old.size_bytes;
        } else if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.lru.evict_oldest() {
                if let Some(old) = self.entries.remove(&evicted) {
                    self.total_bytes -= old.size_bytes;
                }
                self.stats.record_eviction();
                debug!(key = %evicted, "memory tier evicted least recently used entry");
            }
        }

        let entry = CacheEntry::new(key.clone(), value, now, ttl, size_bytes);
        self.total_bytes += size_bytes;
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key, now);

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and counted as misses. A hit refreshes the
    /// entry's recency.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_miss();
            debug!(key, "memory tier entry expired on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        self.lru.touch(key, now);
        self.stats.record_hit();
        Some(value)
    }

    // == Delete ==
    /// Removes an entry. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Has ==
    /// True if the key is present and not expired. Does not affect recency.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.total_bytes = 0;
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        expired_keys.len()
    }

    // == Size ==
    /// Number of entries held, including expired ones not yet detected.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    // == Stats ==
    pub fn get_stats(&self) -> MemoryStats {
        let now = self.clock.now_ms();
        MemoryStats {
            size: self.entries.len(),
            capacity: self.capacity,
            expired_count: self.entries.values().filter(|e| e.is_expired(now)).count(),
            utilization_percent: utilization_percent(
                self.entries.len() as u64,
                self.capacity as u64,
            ),
            hit_rate: self.stats.hit_rate(),
            total_bytes: self.total_bytes,
            ..self.stats.clone()
        }
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_bytes -= entry.size_bytes;
                self.lru.remove(key);
                true
            }
            None => false,
        }
    }
}
