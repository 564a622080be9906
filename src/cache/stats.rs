//! Cache Statistics Module
//!
//! Diagnostic snapshots for each tier. Nothing in the cache reads these back
//! for control flow.

use serde::Serialize;

// == Memory Stats ==
/// Snapshot of the memory tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    /// Number of entries currently held (expired ones included until detected)
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
    /// Entries that are past their TTL but not yet evicted
    pub expired_count: usize,
    /// `size / capacity` as a percentage
    pub utilization_percent: f64,
    /// Number of successful retrievals
    pub hits: u64,
    /// Number of failed retrievals (absent or expired)
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 before the first read
    pub hit_rate: f64,
    /// Number of entries evicted by the LRU policy
    pub evictions: u64,
    /// Sum of the caller-reported entry sizes
    pub total_bytes: usize,
}

impl MemoryStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}

// == Disk Stats ==
/// Snapshot of the durable tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskStats {
    /// Number of indexed entries
    pub entries: usize,
    /// Sum of indexed entry sizes in bytes
    pub total_size: u64,
    /// Byte budget
    pub max_size: u64,
    /// `total_size / max_size` as a percentage
    pub utilization_percent: f64,
    /// Unix milliseconds of the last completed sweep
    pub last_cleanup: Option<u64>,
}

// == Tier Stats ==
/// Per-cache snapshot combining both tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierStats {
    pub memory: MemoryStats,
    pub disk: DiskStats,
}

/// Percentage of `capacity` in use; 0.0 for a zero capacity.
pub fn utilization_percent(used: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        used as f64 / capacity as f64 * 100.0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = MemoryStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = MemoryStats::default();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = MemoryStats::default();
        stats.record_eviction();
        stats.record_eviction();
        assert_eq!(stats.evictions, 2);
    }

    #[test]
    fn test_utilization_percent() {
        assert_eq!(utilization_percent(25, 100), 25.0);
        assert_eq!(utilization_percent(150, 100), 150.0);
        assert_eq!(utilization_percent(10, 0), 0.0);
    }
}
