//! Session registry example
//!
//! Several "connection handler" threads share one `ConcurrentMap` of live
//! sessions. Handlers log in with `get_or_set` so concurrent logins for the
//! same user agree on one session, and a reaper thread walks the map and
//! drops stale sessions while handlers keep running.

use cmap::{ConcurrentMap, MapConfig, MetricsCollector};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Session {
    id: u64,
    handler: usize,
    started: Instant,
}

struct SessionRegistry {
    sessions: ConcurrentMap<String, Session>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl SessionRegistry {
    fn new(ttl: Duration) -> Result<Self, cmap::Error> {
        Ok(Self {
            sessions: ConcurrentMap::with_config(
                MapConfig::default()
                    .with_initial_capacity(1024)
                    .with_metrics(true),
            )?,
            next_id: AtomicU64::new(1),
            ttl,
        })
    }

    /// Return the user's live session, creating one if needed
    fn login(&self, user: &str, handler: usize) -> Session {
        let candidate = Session {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            handler,
            started: Instant::now(),
        };
        self.sessions.get_or_set(user.to_string(), candidate)
    }

    fn logout(&self, user: &str) -> bool {
        self.sessions.delete(user)
    }

    /// Drop every session older than the TTL, returning how many went away
    fn reap(&self) -> usize {
        let mut reaped = 0;
        self.sessions.range(|user, session| {
            if session.started.elapsed() > self.ttl && self.sessions.delete(user) {
                reaped += 1;
            }
            true
        });
        reaped
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Session Registry Example");
    println!("========================");

    let registry = Arc::new(SessionRegistry::new(Duration::from_millis(20))?);
    let running = Arc::new(AtomicBool::new(true));
    let num_handlers = 4;
    let barrier = Arc::new(Barrier::new(num_handlers + 1));

    let reaper = {
        let registry = Arc::clone(&registry);
        let running = Arc::clone(&running);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let mut total = 0;
            while running.load(Ordering::Relaxed) {
                total += registry.reap();
                thread::sleep(Duration::from_millis(5));
            }
            total
        })
    };

    let handlers: Vec<_> = (0..num_handlers)
        .map(|handler| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut shared_logins = 0;
                for round in 0..2000 {
                    let user = format!("user_{}", round % 100);
                    let session = registry.login(&user, handler);
                    if session.handler != handler {
                        shared_logins += 1;
                    }
                    if round % 7 == handler {
                        registry.logout(&user);
                    }
                }
                shared_logins
            })
        })
        .collect();

    let mut shared = 0;
    for handle in handlers {
        shared += handle.join().map_err(|_| "handler thread panicked")?;
    }
    running.store(false, Ordering::Relaxed);
    let reaped = reaper.join().map_err(|_| "reaper thread panicked")?;

    let metrics = registry.sessions.metrics();
    println!("\nResults:");
    println!("   live sessions:         {}", registry.sessions.count());
    println!("   logins joining others: {}", shared);
    println!("   sessions reaped:       {}", reaped);
    println!("   sessions created:      {}", metrics.inserts);
    println!("   explicit logouts:      {}", metrics.removals as usize - reaped);
    if let Some(sample) = registry.sessions.values().next() {
        println!("   sample session:        #{} via handler {}", sample.id, sample.handler);
    }

    assert_eq!(
        registry.sessions.count(),
        registry.sessions.keys().count() as i64
    );
    Ok(())
}
