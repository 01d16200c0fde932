//! Concurrent Map Implementation
//!
//! This module implements a counted concurrent map on top of
//! [`ShardedStore`]. The store owns the entries; the map adds a live element
//! counter that stays exact without ever scanning the store.
//!
//! ## Design
//!
//! Every mutating operation makes exactly one call into the store and adjusts
//! the counter from that call's result:
//! - `set` swaps and increments only if no previous value came back
//! - `set_if_absent` / `get_or_set` increment only if their insert happened
//! - `delete` decrements only if a value was actually removed
//!
//! Membership is never checked separately, so two racing callers can't both
//! count the same insert or removal.
//!
//! ## Memory Ordering
//!
//! The counter is updated with relaxed read-modify-writes after the shard
//! lock is released. While calls on the same key overlap, `count()` can lag
//! or briefly run ahead (even below zero); once they return it is exact.
//!
//! ## Example
//!
//! ```rust
//! use cmap::ConcurrentMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(ConcurrentMap::new());
//!
//! let writers: Vec<_> = (0..4)
//!     .map(|t| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || {
//!             for i in 0..250 {
//!                 map.set(t * 250 + i, i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for writer in writers {
//!     writer.join().unwrap();
//! }
//! assert_eq!(map.count(), 1000);
//! ```

use super::config::MapConfig;
use super::iter::{Iter, Keys, Values};
use crate::metrics::{AtomicMetrics, MapMetrics, MetricsCollector};
use crate::store::ShardedStore;
use crate::util::CachePadded;
use crate::Result;
use ahash::RandomState;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicI64, Ordering};

/// A thread-safe hash map with an exact live element count
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq`
/// * `V` - The value type; operations that return values need `V: Clone`
/// * `S` - The hasher, [`ahash::RandomState`] by default
///
/// # Examples
///
/// ```rust
/// use cmap::ConcurrentMap;
///
/// let map: ConcurrentMap<String, u32> = ConcurrentMap::new();
/// assert!(map.set("a".to_string(), 1));
/// assert!(!map.set("a".to_string(), 2));
/// assert_eq!(map.get("a"), Some(2));
/// assert!(map.delete("a"));
/// assert!(map.is_empty());
/// ```
pub struct ConcurrentMap<K, V, S = RandomState> {
    store: ShardedStore<K, V, S>,
    count: CachePadded<AtomicI64>,
    metrics: AtomicMetrics,
    initial_capacity: usize,
}

impl<K, V> ConcurrentMap<K, V, RandomState>
where
    K: Hash + Eq,
{
    /// Create an empty map with the default configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<i32, String> = ConcurrentMap::new();
    /// assert_eq!(map.count(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Create an empty map from `config`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShardCount`](crate::Error::InvalidShardCount) if the
    /// shard count is zero or above [`MAX_SHARDS`](crate::store::MAX_SHARDS).
    pub fn with_config(config: MapConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Clone,
{
    /// Create an empty map that hashes keys with `hasher`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    /// use std::collections::hash_map::RandomState;
    ///
    /// let map: ConcurrentMap<u8, u8, _> = ConcurrentMap::with_hasher(RandomState::new());
    /// map.set(1, 1);
    /// assert!(map.has(&1));
    /// ```
    pub fn with_hasher(hasher: S) -> Self {
        let config = MapConfig::default();
        Self::from_store(
            ShardedStore::build(config.shard_count, config.initial_capacity, hasher),
            &config,
        )
    }

    /// Create an empty map from `config` that hashes keys with `hasher`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShardCount`](crate::Error::InvalidShardCount) if the
    /// shard count is zero or above [`MAX_SHARDS`](crate::store::MAX_SHARDS).
    pub fn with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self> {
        let store = ShardedStore::new(config.shard_count, config.initial_capacity, hasher)?;
        Ok(Self::from_store(store, &config))
    }

    fn from_store(store: ShardedStore<K, V, S>, config: &MapConfig) -> Self {
        tracing::debug!(
            shards = store.shard_count(),
            initial_capacity = config.initial_capacity,
            metrics = config.metrics,
            "concurrent map created"
        );
        Self {
            store,
            count: CachePadded::new(AtomicI64::new(0)),
            metrics: AtomicMetrics::new(config.metrics),
            initial_capacity: config.initial_capacity,
        }
    }

    /// Insert `value` under `key` only if `key` is absent
    ///
    /// # Returns
    ///
    /// * `true` if a new entry was created
    /// * `false` if `key` was already present; the map is unchanged and
    ///   `value` is dropped
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert!(map.set_if_absent("elephant", 1));
    /// assert!(!map.set_if_absent("elephant", 2));
    /// assert_eq!(map.get("elephant"), Some(1));
    /// ```
    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        let inserted = self.store.store_if_absent(key, value);
        if inserted {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.record_insert_if_absent(inserted);
        inserted
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Returns
    ///
    /// * `true` if `key` was newly created
    /// * `false` if an existing value was replaced (and dropped)
    pub fn set(&self, key: K, value: V) -> bool {
        let created = self.store.swap(key, value).is_none();
        if created {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.record_set(created);
        created
    }

    /// Check whether `key` is present
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.store.contains_key(key);
        self.metrics.record_lookup(found);
        found
    }

    /// Get a clone of the value stored under `key`
    ///
    /// Returns `None` for a missing key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map: ConcurrentMap<String, String> = ConcurrentMap::new();
    /// assert_eq!(map.get("Money"), None);
    /// map.set("Money".to_string(), "elephant".to_string());
    /// assert_eq!(map.get("Money").as_deref(), Some("elephant"));
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let value = self.store.load(key);
        self.metrics.record_lookup(value.is_some());
        value
    }

    /// Return the value under `key`, inserting `value` first if `key` is absent
    ///
    /// Of several callers racing on the same absent key exactly one inserts,
    /// and all of them get the winner's value back.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.get_or_set("Money", "elephant"), "elephant");
    /// assert_eq!(map.get_or_set("Money", "lion"), "elephant");
    /// assert_eq!(map.count(), 1);
    /// ```
    pub fn get_or_set(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        self.load_or_store(key, value).0
    }

    /// Like [`get_or_set`](Self::get_or_set), but also reports whether the
    /// key was already present
    ///
    /// # Returns
    ///
    /// * `(existing, true)` if `key` was present; `value` is dropped
    /// * `(value, false)` if `value` was inserted
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        let (stored, was_present) = self.store.load_or_store(key, value);
        if !was_present {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.record_insert_if_absent(!was_present);
        (stored, was_present)
    }

    /// Remove the entry for `key`
    ///
    /// Returns `true` if an entry was removed, `false` if `key` was absent.
    /// Deleting a missing key is a no-op.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.store.load_and_delete(key).is_some();
        if removed {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
        self.metrics.record_removal(removed);
        removed
    }

    /// Alias for [`delete`](Self::delete)
    #[inline]
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.delete(key)
    }

    /// Call `f` on entries until it returns `false`
    ///
    /// Entries are copied out shard by shard, so `f` may call back into the
    /// map. Same consistency as [`iter`](Self::iter).
    pub fn range<F>(&self, mut f: F)
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        for entry in self.iter() {
            if !f(&entry.key, &entry.value) {
                break;
            }
        }
    }

    /// Remove every entry visible to a traversal started now
    ///
    /// Each key goes through [`delete`](Self::delete), so the count stays
    /// exact. Entries inserted by other threads while `clear` runs may
    /// survive it.
    pub fn clear(&self)
    where
        K: Clone,
    {
        let mut removed = 0usize;
        for key in self.keys() {
            if self.delete(&key) {
                removed += 1;
            }
        }
        self.metrics.record_clear();
        tracing::debug!(removed, remaining = self.count(), "map cleared");
    }
}

impl<K, V, S> ConcurrentMap<K, V, S> {
    /// Number of entries, read from the live counter in O(1)
    #[inline]
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    /// [`count`](Self::count) as a `usize`, clamped at zero
    #[inline]
    pub fn len(&self) -> usize {
        usize::try_from(self.count()).unwrap_or(0)
    }

    /// Whether [`count`](Self::count) is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of shards backing the map
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.store.shard_count()
    }

    /// Get a reference to the map's hasher
    #[inline]
    pub fn hasher(&self) -> &S {
        self.store.hasher()
    }

    /// Iterate over copies of the map's entries
    ///
    /// The iterator is lazy, finite and weakly consistent: an entry inserted
    /// or removed while it runs may or may not be seen. Dropping it early is
    /// always safe.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// for i in 0..100 {
    ///     map.set(i.to_string(), i);
    /// }
    /// let sum: i32 = map.iter().map(|entry| entry.value).sum();
    /// assert_eq!(sum, 4950);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, S>
    where
        K: Clone,
        V: Clone,
    {
        Iter::new(&self.store)
    }

    /// Iterate over copies of the map's keys
    pub fn keys(&self) -> Keys<'_, K, V, S>
    where
        K: Clone,
    {
        Keys::new(&self.store)
    }

    /// Iterate over copies of the map's values
    pub fn values(&self) -> Values<'_, K, V, S>
    where
        V: Clone,
    {
        Values::new(&self.store)
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &ShardedStore<K, V, S> {
        &self.store
    }
}

impl<K, V, S> MetricsCollector for ConcurrentMap<K, V, S> {
    fn metrics(&self) -> MapMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics.set_enabled(enabled);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics.is_enabled()
    }
}

impl<K, V> Default for ConcurrentMap<K, V, RandomState>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Clone for ConcurrentMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Copy a weakly consistent view of the map into a new map with the same
    /// shard layout, hasher and metrics setting. Metrics counters start at zero.
    fn clone(&self) -> Self {
        let config = MapConfig {
            shard_count: self.shard_count(),
            initial_capacity: self.initial_capacity.max(self.len()),
            metrics: self.is_metrics_enabled(),
        };
        let copy = Self::from_store(
            ShardedStore::build(
                config.shard_count,
                config.initial_capacity,
                self.hasher().clone(),
            ),
            &config,
        );
        for entry in self.iter() {
            copy.set(entry.key, entry.value);
        }
        copy.reset_metrics();
        copy
    }
}

impl<K, V, S> fmt::Debug for ConcurrentMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("count", &self.count())
            .field("shards", &self.shard_count())
            .finish_non_exhaustive()
    }
}

impl<K, V, S> Extend<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V, RandomState>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a ConcurrentMap<K, V, S>
where
    K: Clone,
    V: Clone,
{
    type Item = super::Entry<K, V>;
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
