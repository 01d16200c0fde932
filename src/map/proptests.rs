//! Property-based tests for the concurrent map using proptest
//!
//! These tests drive the map with random operation sequences and check it
//! against `std::collections::HashMap` as a model.

use super::*;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, u32),
    SetIfAbsent(u8, u32),
    GetOrSet(u8, u32),
    Delete(u8),
    Get(u8),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Set(k, v)),
        2 => (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::SetIfAbsent(k, v)),
        2 => (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::GetOrSet(k, v)),
        3 => any::<u8>().prop_map(Op::Delete),
        2 => any::<u8>().prop_map(Op::Get),
        1 => Just(Op::Clear),
    ]
}

/// Property: a single-threaded run behaves exactly like `HashMap`
#[cfg(test)]
mod model_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_matches_hashmap_model(
            shard_count in 1usize..32,
            ops in prop::collection::vec(op_strategy(), 1..300)
        ) {
            let map = ConcurrentMap::with_config(
                MapConfig::default().with_shard_count(shard_count)
            ).unwrap();
            let mut model: HashMap<u8, u32> = HashMap::new();

            for op in ops {
                match op {
                    Op::Set(k, v) => {
                        prop_assert_eq!(map.set(k, v), model.insert(k, v).is_none());
                    }
                    Op::SetIfAbsent(k, v) => {
                        let expected = !model.contains_key(&k);
                        if expected {
                            model.insert(k, v);
                        }
                        prop_assert_eq!(map.set_if_absent(k, v), expected);
                    }
                    Op::GetOrSet(k, v) => {
                        let expected = *model.entry(k).or_insert(v);
                        prop_assert_eq!(map.get_or_set(k, v), expected);
                    }
                    Op::Delete(k) => {
                        prop_assert_eq!(map.delete(&k), model.remove(&k).is_some());
                    }
                    Op::Get(k) => {
                        prop_assert_eq!(map.get(&k), model.get(&k).copied());
                        prop_assert_eq!(map.has(&k), model.contains_key(&k));
                    }
                    Op::Clear => {
                        map.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(map.count(), model.len() as i64);
                prop_assert_eq!(map.is_empty(), model.is_empty());
            }

            let mut entries: Vec<(u8, u32)> = map.iter().map(Into::into).collect();
            entries.sort_unstable();
            let mut expected: Vec<(u8, u32)> = model.into_iter().collect();
            expected.sort_unstable();
            prop_assert_eq!(entries, expected);
        }

        #[test]
        fn test_keys_are_distinct_and_match_count(
            keys in prop::collection::vec(any::<u16>(), 0..500)
        ) {
            let map = ConcurrentMap::new();
            for key in &keys {
                map.set(*key, ());
            }

            let mut seen: Vec<u16> = map.keys().collect();
            seen.sort_unstable();
            let len_before = seen.len();
            seen.dedup();

            prop_assert_eq!(seen.len(), len_before);
            prop_assert_eq!(seen.len() as i64, map.count());
        }
    }
}

/// Property: the count stays paired with membership under threads
#[cfg(test)]
mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_count_matches_membership_after_threads(
            batches in prop::collection::vec(
                prop::collection::vec(op_strategy(), 1..100),
                2..6
            )
        ) {
            let map = Arc::new(ConcurrentMap::new());

            let handles: Vec<_> = batches
                .into_iter()
                .map(|ops| {
                    let map = Arc::clone(&map);
                    thread::spawn(move || {
                        for op in ops {
                            match op {
                                Op::Set(k, v) => {
                                    map.set(k, v);
                                }
                                Op::SetIfAbsent(k, v) => {
                                    map.set_if_absent(k, v);
                                }
                                Op::GetOrSet(k, v) => {
                                    map.get_or_set(k, v);
                                }
                                Op::Delete(k) => {
                                    map.delete(&k);
                                }
                                Op::Get(k) => {
                                    map.get(&k);
                                }
                                Op::Clear => map.clear(),
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            let present = (0..=u8::MAX).filter(|k| map.has(k)).count();
            prop_assert_eq!(map.count(), present as i64);
            prop_assert_eq!(map.keys().count(), present);
        }
    }
}
