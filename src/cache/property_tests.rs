//! Property-Based Tests for the Cache Engine
//!
//! Uses proptest to check the engine invariants over random operation
//! sequences.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::{
    CacheEngine, EngineConfig, Invalidation, SetOptions, StoreConfig, StorePriority,
};

// == Test Configuration ==
const STORES: [&str; 3] = ["api", "static", "user"];

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,16}"
}

fn valid_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{1,64}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(|v| json!(v)),
    ]
}

fn store_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(STORES.to_vec())
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set {
        store: &'static str,
        key: String,
        value: Value,
        size: usize,
        ttl: Option<u64>,
        pinned: bool,
    },
    Get {
        store: &'static str,
        key: String,
    },
    Invalidate {
        store: &'static str,
        key: String,
    },
    Advance(u64),
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (
            store_strategy(),
            valid_key_strategy(),
            valid_value_strategy(),
            1usize..4096,
            prop::option::of(1u64..120_000),
            any::<bool>(),
        )
            .prop_map(|(store, key, value, size, ttl, pinned)| CacheOp::Set {
                store,
                key,
                value,
                size,
                ttl,
                pinned,
            }),
        3 => (store_strategy(), valid_key_strategy())
            .prop_map(|(store, key)| CacheOp::Get { store, key }),
        1 => (store_strategy(), valid_key_strategy())
            .prop_map(|(store, key)| CacheOp::Invalidate { store, key }),
        1 => (1u64..600_000).prop_map(CacheOp::Advance),
    ]
}

fn small_engine() -> CacheEngine {
    let config = EngineConfig::default()
        .with_profile("api", StoreConfig::new(8, 300_000, StorePriority::Normal))
        .with_profile("static", StoreConfig::new(5, 900_000, StorePriority::Low))
        .with_profile("user", StoreConfig::new(3, 600_000, StorePriority::High));
    CacheEngine::new(config)
}

/// Replays `ops` starting at t=0 and returns the final clock.
fn replay(engine: &mut CacheEngine, ops: &[CacheOp]) -> u64 {
    let mut now = 0u64;
    for op in ops {
        match op.clone() {
            CacheOp::Get { store, key } => {
                let _ = engine.get_at(store, &key, now);
            }
            CacheOp::Advance(ms) => now += ms,
            other => replay_at(engine, other, now),
        }
    }
    now
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every store stays within max_entries after any sequence of operations.
    #[test]
    fn prop_capacity_enforcement(ops in prop::collection::vec(cache_op_strategy(), 1..200)) {
        let mut engine = small_engine();
        replay(&mut engine, &ops);

        let stats = engine.get_cache_stats().unwrap();
        for (name, store) in &stats.stores {
            prop_assert!(
                store.size <= store.max_entries,
                "store {} holds {} > {}",
                name,
                store.size,
                store.max_entries
            );
        }
    }

    // Hit rate equals hits / lookups as observed by the caller.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let mut engine = small_engine();
        let mut now = 0u64;
        let mut hits = 0u64;
        let mut misses = 0u64;

        for op in &ops {
            match op.clone() {
                CacheOp::Get { store, key } => match engine.get_at(store, &key, now).unwrap() {
                    Some(_) => hits += 1,
                    None => misses += 1,
                },
                CacheOp::Advance(ms) => now += ms,
                other => {
                    replay_at(&mut engine, other, now);
                }
            }
        }

        let stats = engine.get_cache_stats().unwrap();
        let observed_hits: u64 = stats.stores.values().map(|s| s.hits).sum();
        let observed_misses: u64 = stats.stores.values().map(|s| s.misses).sum();
        // Lookups in stores that were never created are not counted anywhere
        prop_assert_eq!(observed_hits, hits);
        prop_assert!(observed_misses <= misses);
        for store in stats.stores.values() {
            let lookups = store.hits + store.misses;
            let expected = if lookups == 0 { 0.0 } else { store.hits as f64 / lookups as f64 };
            prop_assert!((store.hit_rate - expected).abs() < 1e-12);
        }
    }

    // set followed by get returns the stored value.
    #[test]
    fn prop_roundtrip_storage(
        store in store_strategy(),
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        let mut engine = small_engine();
        engine.set_at(store, &key, value.clone(), SetOptions::default(), 0).unwrap();
        prop_assert_eq!(engine.get_at(store, &key, 0).unwrap(), Some(value));
    }

    // Memory accounting matches the sum of live entry sizes.
    #[test]
    fn prop_memory_accounting(ops in prop::collection::vec(cache_op_strategy(), 1..150)) {
        let mut engine = small_engine();
        replay(&mut engine, &ops);

        let stats = engine.get_cache_stats().unwrap();
        let by_store: usize = stats.stores.values().map(|s| s.memory_usage).sum();
        prop_assert_eq!(stats.total_memory_usage, by_store);
        prop_assert_eq!(stats.total_memory_usage, engine.total_memory_usage());
    }

    // MaxAge(0) empties the store.
    #[test]
    fn prop_invalidate_max_age_zero_clears(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let mut engine = small_engine();
        let now = replay(&mut engine, &ops);

        for store in STORES {
            engine.invalidate_at(store, Invalidation::MaxAge(0), now).unwrap();
        }
        let stats = engine.get_cache_stats().unwrap();
        prop_assert_eq!(stats.total_entries, 0);
        prop_assert_eq!(stats.total_memory_usage, 0);
    }

    // Memory cleanup never grows memory; aggressive ends at or below it.
    #[test]
    fn prop_cleanup_levels_are_ordered(
        ops in prop::collection::vec(cache_op_strategy(), 1..150),
        extra in 0u64..900_000
    ) {
        let mut soft = small_engine();
        let mut hard = small_engine();
        let now = replay(&mut soft, &ops) + extra;
        replay(&mut hard, &ops);

        let soft_report = soft.perform_memory_cleanup_at(now).unwrap();
        let hard_report = hard.perform_aggressive_cleanup_at(now).unwrap();

        prop_assert!(soft_report.memory_after <= soft_report.memory_before);
        prop_assert_eq!(soft_report.memory_before, hard_report.memory_before);
        prop_assert!(hard_report.memory_after <= soft_report.memory_after);
    }

    // Filling a store past capacity evicts the first-written key.
    #[test]
    fn prop_lru_eviction_order(keys in prop::collection::hash_set(valid_key_strategy(), 3..8)) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len() - 1;
        let config = EngineConfig::default()
            .with_profile("api", StoreConfig::new(capacity, 300_000, StorePriority::Normal));
        let mut engine = CacheEngine::new(config);

        for key in &keys {
            engine.set_at("api", key, json!(key), SetOptions::default(), 0).unwrap();
        }

        prop_assert!(engine.peek("api", &keys[0]).is_none());
        for key in keys.iter().skip(1) {
            prop_assert!(engine.peek("api", key).is_some());
        }
    }
}

fn replay_at(engine: &mut CacheEngine, op: CacheOp, now: u64) {
    match op {
        CacheOp::Set {
            store,
            key,
            value,
            size,
            ttl,
            pinned,
        } => {
            let mut options = SetOptions::default().sized(size);
            options.ttl_ms = ttl;
            options.high_priority = pinned;
            let _ = engine.set_at(store, &key, value, options, now);
        }
        CacheOp::Invalidate { store, key } => {
            let _ = engine.invalidate_at(store, Invalidation::Key(&key), now);
        }
        CacheOp::Get { .. } | CacheOp::Advance(_) => {}
    }
}
