//! Stress tests for the concurrent map

use super::*;
use crate::metrics::MetricsCollector;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_set_then_delete_count() {
    let map = Arc::new(ConcurrentMap::new());
    let size = 100;

    let handles: Vec<_> = (0..size)
        .map(|i| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for j in i * size..(i + 1) * size {
                    map.set(j.to_string(), j);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(map.count(), (size * size) as i64);

    let handles: Vec<_> = (0..size)
        .map(|i| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for j in i * size..(i + 1) * size {
                    assert!(map.delete(j.to_string().as_str()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.count(), 0, "Expecting 0 elements within map");
    assert_eq!(map.store().scan_len(), 0);
}

#[test]
fn test_concurrent_set_get_accumulator() {
    let map = Arc::new(ConcurrentMap::new());
    let (tx, rx) = crossbeam::channel::unbounded();
    let iterations = 1000;

    let handles: Vec<_> = [0..iterations / 2, iterations / 2..iterations]
        .into_iter()
        .map(|range| {
            let map = Arc::clone(&map);
            let tx = tx.clone();
            thread::spawn(move || {
                for i in range {
                    map.set(i, i);
                    let value = map.get(&i).unwrap();
                    tx.send(value).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    let mut accumulator: Vec<i32> = rx.iter().collect();
    for handle in handles {
        handle.join().unwrap();
    }

    accumulator.sort_unstable();
    assert_eq!(accumulator, (0..iterations).collect::<Vec<_>>());
    assert_eq!(map.count(), iterations as i64);
}

#[test]
fn test_set_if_absent_single_winner() {
    let map = Arc::new(ConcurrentMap::new());
    let num_threads = 16;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let map = Arc::clone(&map);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let won = map.set_if_absent("contended", thread_id);
                (won, map.get("contended").unwrap())
            })
        })
        .collect();

    let results: Vec<(bool, usize)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, (won, _))| *won)
        .map(|(thread_id, _)| thread_id)
        .collect();

    assert_eq!(winners.len(), 1);
    let stored = map.get("contended").unwrap();
    assert_eq!(stored, winners[0]);
    assert!(results.iter().all(|(_, seen)| *seen == stored));
    assert_eq!(map.count(), 1);
}

#[test]
fn test_get_or_set_racers_agree() {
    let map = Arc::new(ConcurrentMap::new());
    let num_threads = 16;
    let keys = 64;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let map = Arc::clone(&map);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..keys)
                    .map(|key| map.get_or_set(key, format!("thread_{}", thread_id)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let observed: Vec<Vec<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for key in 0..keys {
        let stored = map.get(&key).unwrap();
        for per_thread in &observed {
            assert_eq!(per_thread[key], stored, "callers disagree on key {}", key);
        }
    }
    assert_eq!(map.count(), keys as i64);
}

#[test]
fn test_high_contention_count_matches_membership() {
    let map = Arc::new(ConcurrentMap::with_config(MapConfig::default().with_shard_count(4)).unwrap());
    let num_threads = 16;
    let operations_per_thread = 2000;

    // All threads work on the same small set of keys to maximize contention
    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..operations_per_thread {
                    let key = (i * 7 + thread_id) % 10;
                    match i % 4 {
                        0 => {
                            map.set(key, thread_id);
                        }
                        1 => {
                            map.set_if_absent(key, thread_id);
                        }
                        2 => {
                            map.delete(&key);
                        }
                        3 => {
                            map.get_or_set(key, thread_id);
                        }
                        _ => unreachable!(),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let present = (0..10).filter(|key| map.has(key)).count();
    assert_eq!(map.count(), present as i64);
    assert_eq!(map.store().scan_len(), present);
}

#[test]
fn test_metrics_pair_with_count_under_contention() {
    let map = Arc::new(ConcurrentMap::with_config(MapConfig::default().with_metrics(true)).unwrap());
    let num_threads = 8;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..1000 {
                    let key = i % 50;
                    if (i + thread_id) % 3 == 0 {
                        map.delete(&key);
                    } else {
                        map.set(key, i);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.metrics().net_inserted(), map.count());
}

#[test]
fn test_iteration_during_writes() {
    let map = Arc::new(ConcurrentMap::new());
    for i in 0..1000 {
        map.set(i, i);
    }

    let writer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            for i in 1000..2000 {
                map.set(i, i);
                map.delete(&(i - 1000));
            }
        })
    };

    // Every yielded entry must be a real pair, and no key may repeat.
    let mut seen = HashSet::new();
    for entry in map.iter() {
        assert_eq!(entry.key, entry.value);
        assert!(seen.insert(entry.key), "duplicate key {}", entry.key);
    }

    writer.join().unwrap();
    assert_eq!(map.count(), 1000);
    assert_eq!(map.keys().count(), 1000);
}

#[test]
fn test_abandoned_iterators_do_not_block() {
    let map = Arc::new(ConcurrentMap::new());
    for i in 0..1000 {
        map.set(i, i.to_string());
    }

    for _ in 0..100 {
        let mut iter = map.iter();
        let _ = iter.next();
        drop(iter);
    }

    let mut held = map.keys();
    assert!(held.next().is_some());

    // A half-consumed iterator held on this thread must not stall writers.
    let worker = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            map.clear();
            map.set(5000, "after".to_string());
        })
    };
    worker.join().unwrap();

    assert_eq!(map.count(), 1);
    drop(held);
}

#[test]
fn test_clear_races_with_inserts() {
    let map = Arc::new(ConcurrentMap::new());
    for i in 0..1000 {
        map.set(i, i);
    }

    let inserter = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            for i in 1000..3000 {
                map.set(i, i);
                if i % 100 == 0 {
                    thread::sleep(Duration::from_micros(1));
                }
            }
        })
    };
    map.clear();
    inserter.join().unwrap();

    // Late inserts may or may not survive; the count must still be exact.
    assert_eq!(map.count(), map.store().scan_len() as i64);
    assert!(map.count() <= 2000);
    assert!((0..1000).all(|key| !map.has(&key)));
    map.clear();
    assert_eq!(map.count(), 0);
}

#[test]
fn test_memory_safety_on_drop() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Clone)]
    struct DropTracker;

    impl Drop for DropTracker {
        fn drop(&mut self) {
            DROP_COUNT.fetch_add(1, Ordering::Relaxed);
        }
    }

    let map: Arc<ConcurrentMap<usize, DropTracker>> = Arc::new(ConcurrentMap::new());
    let num_threads = 4;
    let items_per_thread = 100;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..items_per_thread {
                    let key = thread_id * items_per_thread + i;
                    map.set(key, DropTracker);
                    if i % 2 == 1 {
                        map.delete(&(key - 1));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = num_threads * items_per_thread;
    assert_eq!(DROP_COUNT.load(Ordering::Relaxed), total / 2);
    assert_eq!(map.len(), total / 2);

    drop(map);
    assert_eq!(DROP_COUNT.load(Ordering::Relaxed), total);
}

#[test]
fn test_complex_keys() {
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct ComplexKey {
        id: u64,
        name: String,
        tags: Vec<u32>,
    }

    const ITEMS_PER_THREAD: usize = 100;

    fn key_for(thread_id: usize, i: usize) -> ComplexKey {
        ComplexKey {
            id: (thread_id * ITEMS_PER_THREAD + i) as u64,
            name: format!("item_{}", i),
            tags: vec![i as u32, (i + 1) as u32],
        }
    }

    let map: Arc<ConcurrentMap<ComplexKey, Vec<String>>> = Arc::new(ConcurrentMap::new());
    let num_threads = 4;
    let items_per_thread = ITEMS_PER_THREAD;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..items_per_thread {
                    let key = key_for(thread_id, i);
                    let value = vec![format!("thread_{}", thread_id), format!("item_{}", i)];
                    assert!(map.set(key.clone(), value.clone()));
                    assert_eq!(map.get(&key), Some(value));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for thread_id in 0..num_threads {
        for i in 0..items_per_thread {
            let key = key_for(thread_id, i);
            assert!(map.has(&key), "Missing complex key: {:?}", key);
        }
    }
    assert_eq!(map.count(), (num_threads * items_per_thread) as i64);
}

#[test]
fn test_custom_hasher() {
    let map: ConcurrentMap<u64, u64, fxhash::FxBuildHasher> =
        ConcurrentMap::with_hasher(fxhash::FxBuildHasher::default());
    for i in 0..1000 {
        map.set(i, i * 2);
    }
    assert_eq!(map.count(), 1000);
    assert_eq!(map.get(&500), Some(1000));
}
