//! Operation Metrics Module
//!
//! This module provides opt-in operation counters for [`ConcurrentMap`](crate::ConcurrentMap).
//! Counters are relaxed atomics and are only touched while collection is enabled,
//! so a map with metrics off pays a single relaxed load per operation.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Snapshot of a map's operation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapMetrics {
    /// Number of key lookups (`get`, `has`)
    pub lookups: u64,
    /// Lookups that found the key
    pub hits: u64,
    /// Lookups that did not find the key
    pub misses: u64,
    /// Operations that created a new key
    pub inserts: u64,
    /// `set` calls that replaced an existing value
    pub replacements: u64,
    /// Insert-if-absent calls that found the key already present
    pub rejected_inserts: u64,
    /// Deletes that removed an entry
    pub removals: u64,
    /// Deletes of a key that was not present
    pub missed_removals: u64,
    /// Number of `clear` calls
    pub clears: u64,
}

impl MapMetrics {
    /// Calculate lookup hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / self.lookups as f64) * 100.0
        }
    }

    /// Calculate lookup miss rate as percentage
    pub fn miss_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.misses as f64 / self.lookups as f64) * 100.0
        }
    }

    /// Net change in live entries implied by these counters
    pub fn net_inserted(&self) -> i64 {
        self.inserts as i64 - self.removals as i64
    }
}

/// Internal atomic metrics collection
#[derive(Debug)]
pub(crate) struct AtomicMetrics {
    enabled: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    replacements: AtomicU64,
    rejected_inserts: AtomicU64,
    removals: AtomicU64,
    missed_removals: AtomicU64,
    clears: AtomicU64,
}

impl AtomicMetrics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            replacements: AtomicU64::new(0),
            rejected_inserts: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            missed_removals: AtomicU64::new(0),
            clears: AtomicU64::new(0),
        }
    }

    #[inline]
    fn bump(&self, counter: &AtomicU64) {
        if self.enabled.load(Ordering::Relaxed) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a lookup and whether it found the key
    #[inline]
    pub(crate) fn record_lookup(&self, hit: bool) {
        self.bump(if hit { &self.hits } else { &self.misses });
    }

    /// Record an unconditional store
    #[inline]
    pub(crate) fn record_set(&self, created: bool) {
        self.bump(if created { &self.inserts } else { &self.replacements });
    }

    /// Record an insert-if-absent style call
    #[inline]
    pub(crate) fn record_insert_if_absent(&self, inserted: bool) {
        self.bump(if inserted {
            &self.inserts
        } else {
            &self.rejected_inserts
        });
    }

    /// Record a delete and whether it removed anything
    #[inline]
    pub(crate) fn record_removal(&self, removed: bool) {
        self.bump(if removed {
            &self.removals
        } else {
            &self.missed_removals
        });
    }

    #[inline]
    pub(crate) fn record_clear(&self) {
        self.bump(&self.clears);
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Get current metrics snapshot
    pub(crate) fn snapshot(&self) -> MapMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        MapMetrics {
            lookups: hits + misses,
            hits,
            misses,
            inserts: self.inserts.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            rejected_inserts: self.rejected_inserts.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            missed_removals: self.missed_removals.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub(crate) fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.inserts,
            &self.replacements,
            &self.rejected_inserts,
            &self.removals,
            &self.missed_removals,
            &self.clears,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Trait for data structures that support operation metrics
pub trait MetricsCollector {
    /// Get current operation metrics
    fn metrics(&self) -> MapMetrics;

    /// Reset all metrics
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Check if metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
