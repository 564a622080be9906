//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the tier invariants over random operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{JsonSerializer, ManualClock, MemoryCache, PersistentCache};
use crate::storage::{DurableStore, MemoryStore};

// == Test Configuration ==
const TEST_CAPACITY: usize = 100;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,256}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

/// Small key space so operations collide often.
fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    let key = "k[0-9]{1,2}";
    prop_oneof![
        3 => (key, valid_value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        1 => key.prop_map(|key| CacheOp::Get { key }),
        2 => key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn memory_cache(capacity: usize) -> (MemoryCache<String>, ManualClock) {
    let clock = ManualClock::new(0);
    let cache = MemoryCache::with_clock(capacity, Some(TEST_TTL), Arc::new(clock.clone()));
    (cache, clock)
}

fn persistent_cache(max_bytes: u64) -> (PersistentCache<String>, ManualClock) {
    let clock = ManualClock::new(0);
    let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let cache = PersistentCache::new("prop", max_bytes, store, Arc::new(JsonSerializer::<String>::new()))
        .expect("valid namespace")
        .with_clock(Arc::new(clock.clone()));
    (cache, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing then reading before expiry returns exactly what was stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (mut cache, clock) = memory_cache(TEST_CAPACITY);

        cache.set(key.clone(), value.clone()).unwrap();
        clock.advance(TEST_TTL);

        prop_assert_eq!(cache.get(&key), Some(value));
    }

    // The memory tier never holds more entries than its capacity.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..20,
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let (mut cache, clock) = memory_cache(capacity);

        for (key, value) in entries {
            cache.set(key, value).unwrap();
            clock.advance(Duration::from_millis(1));
            prop_assert!(
                cache.size() <= capacity,
                "Cache size {} exceeds capacity {}",
                cache.size(),
                capacity
            );
        }
    }

    // Filling to capacity then adding one more evicts the first inserted key.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::hash_set(valid_key_strategy(), 2..10),
        new_key in valid_key_strategy(),
    ) {
        prop_assume!(!initial_keys.contains(&new_key));
        let keys: Vec<String> = initial_keys.into_iter().collect();

        let (mut cache, _clock) = memory_cache(keys.len());
        for key in &keys {
            cache.set(key.clone(), format!("value_{}", key)).unwrap();
        }

        cache.set(new_key.clone(), "new".to_string()).unwrap();

        prop_assert!(!cache.has(&keys[0]), "Oldest key should be evicted");
        for key in &keys[1..] {
            prop_assert!(cache.has(key));
        }
        prop_assert!(cache.has(&new_key));
    }

    // Statistics match the observed hits and misses.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let (mut cache, _clock) = memory_cache(TEST_CAPACITY);
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(key, value).unwrap(),
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
            }
        }

        let stats = cache.get_stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.size, cache.size());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // total_size always equals the sum of indexed entry sizes.
    #[test]
    fn prop_total_size_matches_index(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (cache, clock) = persistent_cache(2_000);

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, &value, None).await.unwrap();
                    }
                    CacheOp::Get { key } => {
                        cache.get(&key).await;
                    }
                    CacheOp::Delete { key } => {
                        cache.delete(&key).await.unwrap();
                    }
                }
                clock.advance(Duration::from_millis(1));

                let (total, sum, _) = cache.accounting().await;
                assert_eq!(total, sum);
                assert!(total <= 2_000);
            }
        });
    }

    // A write never pushes the tier past budget by more than its own size.
    #[test]
    fn prop_budget_overshoot_bounded(
        sizes in prop::collection::vec(2usize..120, 1..40),
        max_bytes in 120u64..400,
    ) {
        let (cache, clock) = persistent_cache(max_bytes);
        let mut seen = HashSet::new();

        tokio_test::block_on(async {
            for (i, size) in sizes.into_iter().enumerate() {
                let key = format!("k{}", i % 7);
                seen.insert(key.clone());
                let written = cache.set(&key, &"x".repeat(size - 2), None).await.unwrap();
                clock.advance(Duration::from_millis(1));

                let stats = cache.get_stats().await.unwrap();
                assert!(stats.total_size <= max_bytes + written);
                assert!(stats.entries <= seen.len());
            }
        });
    }
}

// TTL behaviour against the manual clock
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Past its TTL an entry reads as a miss, is gone, and deleting it is a no-op.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in 1u64..10_000,
    ) {
        let (mut cache, clock) = memory_cache(TEST_CAPACITY);
        let ttl = Duration::from_millis(ttl_ms);

        cache.set_with_ttl(key.clone(), value.clone(), Some(ttl)).unwrap();
        prop_assert_eq!(cache.get(&key), Some(value));

        clock.advance(ttl + Duration::from_millis(1));

        prop_assert_eq!(cache.get(&key), None);
        prop_assert_eq!(cache.size(), 0);
        prop_assert!(!cache.delete(&key));
    }
}
