//! Basic usage example for cmap
//!
//! This example walks through the map's single-key operations, a
//! multi-writer scenario, traversal and clearing. Run with
//! `RUST_LOG=cmap=debug` to see the crate's own log events.

use cmap::{ConcurrentMap, MapConfig, MetricsCollector};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
struct Animal {
    name: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("cmap Usage Example");
    println!("==================");

    let map: Arc<ConcurrentMap<String, Animal>> = Arc::new(ConcurrentMap::with_config(
        MapConfig::default().with_shard_count(16).with_metrics(true),
    )?);

    // Single-key operations
    println!("\n1. Basic Operations:");
    let elephant = Animal {
        name: "elephant".to_string(),
    };
    println!("   set(elephant) created: {}", map.set("elephant".into(), elephant.clone()));
    println!("   set(elephant) created: {}", map.set("elephant".into(), elephant));
    println!(
        "   set_if_absent(monkey) inserted: {}",
        map.set_if_absent("monkey".into(), Animal { name: "monkey".into() })
    );
    println!("   get(monkey): {:?}", map.get("monkey"));
    println!("   get(tiger): {:?}", map.get("tiger"));
    println!(
        "   get_or_set(Money): {:?}",
        map.get_or_set("Money".into(), Animal { name: "lion".into() })
    );
    println!("   delete(tiger) removed: {}", map.delete("tiger"));
    println!("   count: {}", map.count());

    // Multiple writers
    println!("\n2. Multiple Writers:");
    let handles: Vec<_> = (0..4)
        .map(|writer| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut created = 0;
                for i in 0..250 {
                    let key = format!("animal_{}", writer * 250 + i);
                    if map.set(key.clone(), Animal { name: key }) {
                        created += 1;
                    }
                }
                created
            })
        })
        .collect();

    let mut total_created = 0;
    for handle in handles {
        total_created += handle.join().map_err(|_| "writer thread panicked")?;
    }
    println!("   created {} entries, count is now {}", total_created, map.count());

    // Traversal
    println!("\n3. Traversal:");
    let sample: Vec<String> = map.keys().take(5).collect();
    println!("   first keys seen: {:?}", sample);
    let long_names = map.values().filter(|animal| animal.name.len() > 10).count();
    println!("   values with long names: {}", long_names);

    // Metrics
    println!("\n4. Metrics:");
    let metrics = map.metrics();
    println!("   inserts: {}, replacements: {}", metrics.inserts, metrics.replacements);
    println!("   lookups: {}, hit rate: {:.1}%", metrics.lookups, metrics.hit_rate());

    // Clear
    println!("\n5. Clear:");
    map.clear();
    println!("   count after clear: {}", map.count());
    println!("   is_empty: {}", map.is_empty());

    Ok(())
}
