//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's expiry, isolation and accounting rules
//! over arbitrary operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CategoryRegistry, TtlCache};

// == Test Configuration ==
const CATEGORIES: [&str; 3] = ["users", "projects", "proposals"];

fn test_cache() -> TtlCache {
    let registry = CATEGORIES.iter().fold(CategoryRegistry::new(), |reg, name| {
        reg.with_category(*name, Duration::from_secs(300), Duration::from_secs(60))
    });
    TtlCache::new(&registry)
}

// == Strategies ==
fn category_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(CATEGORIES.to_vec()).prop_map(str::to_string)
}

fn key_strategy() -> impl Strategy<Value = String> {
    "/[a-z]{1,8}:\\{\\}"
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::String),
        any::<i64>().prop_map(|n| json!(n)),
        prop::collection::vec("[A-Z]", 0..5).prop_map(|v| json!(v)),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { category: String, key: String, value: Value },
    Get { category: String, key: String },
    Delete { category: String, key: String },
    Flush { category: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (category_strategy(), key_strategy(), value_strategy())
            .prop_map(|(category, key, value)| CacheOp::Set { category, key, value }),
        (category_strategy(), key_strategy())
            .prop_map(|(category, key)| CacheOp::Get { category, key }),
        (category_strategy(), key_strategy())
            .prop_map(|(category, key)| CacheOp::Delete { category, key }),
        category_strategy().prop_map(|category| CacheOp::Flush { category }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any operation sequence agrees with a plain model map, and the hit/miss
    // counters match what the caller observed.
    #[test]
    fn prop_matches_model_and_counts(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache = test_cache();
        let mut model: HashMap<(String, String), Value> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { category, key, value } => {
                    prop_assert!(cache.set(&category, key.clone(), value.clone(), None));
                    model.insert((category, key), value);
                }
                CacheOp::Get { category, key } => {
                    let got = cache.get(&category, &key);
                    prop_assert_eq!(&got, &model.get(&(category, key)).cloned());
                    if got.is_some() { expected_hits += 1 } else { expected_misses += 1 }
                }
                CacheOp::Delete { category, key } => {
                    let expected = usize::from(model.remove(&(category.clone(), key.clone())).is_some());
                    prop_assert_eq!(cache.delete(&category, &key), expected);
                }
                CacheOp::Flush { category } => {
                    let before = model.len();
                    model.retain(|(c, _), _| c != &category);
                    prop_assert_eq!(cache.flush_category(&category), before - model.len());
                }
            }
        }

        let stats = cache.stats(None).unwrap();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.keys, model.len());
    }

    // Flushing one category never removes entries from another.
    #[test]
    fn prop_flush_category_isolation(
        entries in prop::collection::vec((category_strategy(), key_strategy(), value_strategy()), 1..40),
        flushed in category_strategy()
    ) {
        let cache = test_cache();
        for (category, key, value) in &entries {
            cache.set(category, key.clone(), value.clone(), None);
        }

        cache.flush_category(&flushed);

        prop_assert_eq!(cache.stats(Some(&flushed)).unwrap().keys, 0);
        for (category, key, _) in entries.iter().filter(|(c, _, _)| c != &flushed) {
            prop_assert!(cache.get(category, key).is_some(), "{} lost {}", category, key);
        }
    }

    // An entry past its expiry is a miss whether or not a sweep has run.
    #[test]
    fn prop_expired_entries_are_misses(
        entries in prop::collection::vec((category_strategy(), key_strategy(), value_strategy()), 1..30),
        sweep_first in any::<bool>()
    ) {
        let cache = test_cache();
        for (category, key, value) in &entries {
            cache.set(category, key.clone(), value.clone(), Some(Duration::ZERO));
        }

        if sweep_first {
            for category in CATEGORIES {
                cache.sweep(category);
            }
        }

        for (category, key, _) in &entries {
            prop_assert!(cache.get(category, key).is_none());
        }
    }

    // Unknown categories degrade to miss/no-op and never touch real ones.
    #[test]
    fn prop_unknown_category_is_inert(key in key_strategy(), value in value_strategy()) {
        let cache = test_cache();
        cache.set("users", key.clone(), value.clone(), None);

        prop_assert!(!cache.set("meetings", key.clone(), value.clone(), None));
        prop_assert!(cache.get("meetings", &key).is_none());
        prop_assert_eq!(cache.flush_category("meetings"), 0);
        prop_assert_eq!(cache.get("users", &key), Some(value));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Readers racing a flush see either the full value or nothing.
    #[test]
    fn prop_concurrent_reads_see_whole_values(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..20)
    ) {
        let cache = test_cache();
        let expected: Arc<HashMap<String, Value>> = Arc::new(entries.iter().cloned().collect());
        for (key, value) in expected.iter() {
            cache.set("projects", key.clone(), value.clone(), None);
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let expected = Arc::clone(&expected);
                std::thread::spawn(move || {
                    for (key, value) in expected.iter() {
                        if let Some(got) = cache.get("projects", key) {
                            assert_eq!(&got, value);
                        }
                    }
                })
            })
            .collect();

        cache.flush_category("projects");

        for reader in readers {
            prop_assert!(reader.join().is_ok());
        }
        prop_assert_eq!(cache.stats(Some("projects")).unwrap().keys, 0);
    }
}
