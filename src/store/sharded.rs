//! Sharded Store Implementation
//!
//! A hash store split into a power-of-two number of shards, each an
//! independent `HashMap` behind its own `parking_lot::RwLock`.
//!
//! ## Design
//!
//! The store uses:
//! - Hash-selected shards so unrelated keys rarely contend
//! - Read locks for lookups, write locks for every mutation
//! - Cache-line padding between shard locks to avoid false sharing
//! - Per-shard snapshots as the traversal primitive
//!
//! A lock is held only for the duration of one `HashMap` operation or one
//! shard snapshot. No guard ever escapes a method.
//!
//! ## Performance Characteristics
//!
//! - **Load / Contains**: O(1) average case, shared lock on one shard
//! - **Swap / StoreIfAbsent / LoadOrStore / LoadAndDelete**: O(1) average
//!   case, exclusive lock on one shard
//! - **Shard snapshot**: O(shard size), shared lock on that shard
//!
//! ## Example
//!
//! ```rust
//! use cmap::store::ShardedStore;
//!
//! let store: ShardedStore<u32, &str> = ShardedStore::new(8, 0, Default::default())?;
//! assert_eq!(store.swap(1, "one"), None);
//! assert!(!store.store_if_absent(1, "uno"));
//! assert_eq!(store.load(&1), Some("one"));
//! assert_eq!(store.load_and_delete(&1), Some("one"));
//! # Ok::<(), cmap::Error>(())
//! ```

use crate::util::CachePadded;
use crate::{Error, Result};
use ahash::RandomState;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use parking_lot::RwLock;
use std::collections::hash_map::{self, HashMap};

/// Largest number of shards a store may be built with
pub const MAX_SHARDS: usize = 1 << 16;

type Shard<K, V, S> = CachePadded<RwLock<HashMap<K, V, S>>>;

/// A concurrent hash store made of independently locked shards
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq`
/// * `V` - The value type
/// * `S` - The hasher used for shard selection and by every shard
pub struct ShardedStore<K, V, S = RandomState> {
    shards: Box<[Shard<K, V, S>]>,
    mask: usize,
    hasher: S,
}

impl<K, V, S> ShardedStore<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Clone,
{
    /// Create a store with `shard_count` shards and room for roughly
    /// `capacity` entries in total.
    ///
    /// The shard count will be rounded up to the next power of 2.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidShardCount`] if `shard_count` is zero or exceeds
    /// [`MAX_SHARDS`].
    pub fn new(shard_count: usize, capacity: usize, hasher: S) -> Result<Self> {
        if shard_count == 0 || shard_count > MAX_SHARDS {
            return Err(Error::InvalidShardCount {
                requested: shard_count,
                max: MAX_SHARDS,
            });
        }

        let rounded = shard_count.next_power_of_two();
        if rounded != shard_count {
            tracing::debug!(
                requested = shard_count,
                rounded,
                "shard count rounded up to a power of two"
            );
        }

        Ok(Self::build(rounded, capacity, hasher))
    }

    /// Build a store from an already validated power-of-two shard count
    pub(crate) fn build(shard_count: usize, capacity: usize, hasher: S) -> Self {
        debug_assert!(shard_count.is_power_of_two() && shard_count <= MAX_SHARDS);

        let per_shard = capacity.div_ceil(shard_count);
        let shards = (0..shard_count)
            .map(|_| {
                CachePadded::new(RwLock::new(HashMap::with_capacity_and_hasher(
                    per_shard,
                    hasher.clone(),
                )))
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(shards = shard_count, per_shard, "sharded store created");

        Self {
            shards,
            mask: shard_count - 1,
            hasher,
        }
    }

    /// Load a clone of the value stored under `key`
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.shard(key).read().get(key).cloned()
    }

    /// Check whether `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard(key).read().contains_key(key)
    }

    /// Store `value` under `key` unconditionally, returning the previous value
    ///
    /// `None` means the key was newly created.
    pub fn swap(&self, key: K, value: V) -> Option<V> {
        self.shard(&key).write().insert(key, value)
    }

    /// Store `value` under `key` only if no entry exists
    ///
    /// Returns `true` if the value was inserted. On `false` nothing was
    /// changed and `value` is dropped.
    pub fn store_if_absent(&self, key: K, value: V) -> bool {
        let mut shard = self.shard(&key).write();
        match shard.entry(key) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Load the value under `key`, storing `value` first if none exists
    ///
    /// Returns the value now stored and `true` if it was already present
    /// (`value` dropped), `false` if `value` was just inserted.
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        let mut shard = self.shard(&key).write();
        match shard.entry(key) {
            hash_map::Entry::Occupied(slot) => (slot.get().clone(), true),
            hash_map::Entry::Vacant(slot) => (slot.insert(value).clone(), false),
        }
    }

    /// Remove the entry for `key`, returning its value if one was present
    pub fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard(key).write().remove(key)
    }

    #[inline]
    fn shard<Q>(&self, key: &Q) -> &RwLock<HashMap<K, V, S>>
    where
        Q: Hash + ?Sized,
    {
        &self.shards[self.shard_index(self.hasher.hash_one(key))]
    }

    #[inline]
    fn shard_index(&self, hash: u64) -> usize {
        // Low bits pick the bucket inside a shard; use the upper half here.
        ((hash >> 32) as usize) & self.mask
    }
}

impl<K, V, S> ShardedStore<K, V, S> {
    /// Number of shards in the store
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Get a reference to the store's hasher
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Map every entry of shard `index` through `f` under a single read lock
    ///
    /// This is the traversal primitive: each shard is internally consistent,
    /// but shards are observed at different moments.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.shard_count()`.
    pub fn snapshot_shard_with<T, F>(&self, index: usize, mut f: F) -> Vec<T>
    where
        F: FnMut(&K, &V) -> T,
    {
        let shard = self.shards[index].read();
        shard.iter().map(|(k, v)| f(k, v)).collect()
    }

    /// Count entries by scanning every shard
    ///
    /// O(shards) and not atomic across shards; use a maintained counter for
    /// anything hot.
    pub fn scan_len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}

impl<K, V, S> fmt::Debug for ShardedStore<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedStore")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}
