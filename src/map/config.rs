//! Map configuration

use crate::store::MAX_SHARDS;
use std::num::NonZeroUsize;
use std::thread;

/// Shards allotted per available CPU by default
const SHARDS_PER_CPU: usize = 4;

/// Construction-time settings for a [`ConcurrentMap`](super::ConcurrentMap)
///
/// # Examples
///
/// ```rust
/// use cmap::{ConcurrentMap, MapConfig};
///
/// let config = MapConfig::default()
///     .with_shard_count(32)
///     .with_initial_capacity(10_000)
///     .with_metrics(true);
/// let map: ConcurrentMap<u64, String> = ConcurrentMap::with_config(config)?;
/// assert_eq!(map.shard_count(), 32);
/// # Ok::<(), cmap::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Number of independently locked shards. Rounded up to a power of two;
    /// must be between 1 and [`MAX_SHARDS`].
    pub shard_count: usize,
    /// Total number of entries to pre-allocate room for, spread over shards
    pub initial_capacity: usize,
    /// Whether operation metrics start out enabled
    pub metrics: bool,
}

impl MapConfig {
    /// Set the shard count
    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Set the initial capacity
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Enable or disable metrics collection from the start
    pub fn with_metrics(mut self, metrics: bool) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            initial_capacity: 0,
            metrics: false,
        }
    }
}

/// Four shards per CPU, as a power of two
pub(crate) fn default_shard_count() -> usize {
    let cpus = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    cpus.saturating_mul(SHARDS_PER_CPU)
        .min(MAX_SHARDS)
        .next_power_of_two()
}
