//! Weakly consistent traversal over a [`ConcurrentMap`](super::ConcurrentMap)
//!
//! Iterators pull one shard at a time: the shard is copied out under its read
//! lock, the lock is released, and the copy is handed to the caller item by
//! item. Nothing runs in the background, so an iterator that is dropped early
//! leaves nothing behind, and a slow consumer never blocks writers.
//!
//! Memory held by an iterator is bounded by the largest shard, not the map.

use crate::store::ShardedStore;
use core::fmt;
use core::iter::FusedIterator;
use std::vec;

/// A key/value pair produced by traversal
///
/// Entries are copies; changing one has no effect on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry<K, V> {
    /// The key
    pub key: K,
    /// The value stored under `key` when its shard was visited
    pub value: V,
}

impl<K, V> From<Entry<K, V>> for (K, V) {
    fn from(entry: Entry<K, V>) -> Self {
        (entry.key, entry.value)
    }
}

/// Shared shard-walking state behind every iterator
struct ShardCursor<'a, K, V, S, T> {
    store: &'a ShardedStore<K, V, S>,
    next_shard: usize,
    buffer: vec::IntoIter<T>,
    project: fn(&K, &V) -> T,
}

impl<'a, K, V, S, T> ShardCursor<'a, K, V, S, T> {
    fn new(store: &'a ShardedStore<K, V, S>, project: fn(&K, &V) -> T) -> Self {
        Self {
            store,
            next_shard: 0,
            buffer: Vec::new().into_iter(),
            project,
        }
    }

    fn next(&mut self) -> Option<T> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(item);
            }
            if self.next_shard >= self.store.shard_count() {
                return None;
            }

            let shard = self.next_shard;
            self.next_shard += 1;
            self.buffer = self.store.snapshot_shard_with(shard, self.project).into_iter();
            tracing::trace!(shard, buffered = self.buffer.len(), "traversal advanced");
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len();
        if self.next_shard >= self.store.shard_count() {
            (remaining, Some(remaining))
        } else {
            (remaining, None)
        }
    }

    fn fmt_as(&self, name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(name)
            .field("next_shard", &self.next_shard)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

macro_rules! shard_iterator {
    ($(#[$meta:meta])* $name:ident, $item:ty, [$($bound:ident : Clone),*], $project:expr) => {
        $(#[$meta])*
        pub struct $name<'a, K, V, S> {
            cursor: ShardCursor<'a, K, V, S, $item>,
        }

        impl<'a, K, V, S> $name<'a, K, V, S>
        where
            $($bound: Clone,)*
        {
            pub(crate) fn new(store: &'a ShardedStore<K, V, S>) -> Self {
                Self {
                    cursor: ShardCursor::new(store, $project),
                }
            }
        }

        impl<'a, K, V, S> Iterator for $name<'a, K, V, S> {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<Self::Item> {
                self.cursor.next()
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.cursor.size_hint()
            }
        }

        impl<'a, K, V, S> FusedIterator for $name<'a, K, V, S> {}

        impl<'a, K, V, S> fmt::Debug for $name<'a, K, V, S> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.cursor.fmt_as(stringify!($name), f)
            }
        }
    };
}

shard_iterator!(
    /// Iterator over the entries of a map, created by
    /// [`ConcurrentMap::iter`](super::ConcurrentMap::iter)
    Iter,
    Entry<K, V>,
    [K: Clone, V: Clone],
    |key: &K, value: &V| Entry {
        key: key.clone(),
        value: value.clone(),
    }
);

shard_iterator!(
    /// Iterator over the keys of a map, created by
    /// [`ConcurrentMap::keys`](super::ConcurrentMap::keys)
    Keys,
    K,
    [K: Clone],
    |key: &K, _: &V| key.clone()
);

shard_iterator!(
    /// Iterator over the values of a map, created by
    /// [`ConcurrentMap::values`](super::ConcurrentMap::values)
    Values,
    V,
    [V: Clone],
    |_: &K, value: &V| value.clone()
);
