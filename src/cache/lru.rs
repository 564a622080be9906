//! LRU Tracker Module
//!
//! Orders keys for eviction in the memory tier.

use std::collections::{BTreeMap, HashMap};

/// Position of a key in eviction order: `(last_access_ms, access_seq)`.
type Rank = (u64, u64);

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// The eviction victim is the key with the smallest last-access timestamp.
/// Keys touched within the same millisecond are ordered by a monotonic access
/// sequence, so untouched keys leave in insertion order.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: BTreeMap<Rank, String>,
    ranks: HashMap<String, Rank>,
    seq: u64,
}

impl LruTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as used at `now_ms`, inserting it if untracked.
    pub fn touch(&mut self, key: &str, now_ms: u64) {
        self.remove(key);
        self.seq += 1;
        let rank = (now_ms, self.seq);
        self.order.insert(rank, key.to_string());
        self.ranks.insert(key.to_string(), rank);
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&rank);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ranks.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.ranks.clear();
    }
}
