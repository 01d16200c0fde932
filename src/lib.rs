//! # cmap
//!
//! A generic, thread-safe hash map that keeps an exact live element count.
//!
//! ## Features
//!
//! - **Sharded store**: striped `RwLock`ed shards with cache-line padding
//! - **Counted map**: every insert and removal is paired 1:1 with a counter update
//! - **Pull-based traversal**: weakly consistent iterators that never hold a lock
//!   while the caller is running
//!
//! ## Quick Start
//!
//! ```rust
//! use cmap::ConcurrentMap;
//!
//! let map = ConcurrentMap::new();
//! assert!(map.set("elephant".to_string(), 1));
//! assert_eq!(map.get("elephant"), Some(1));
//! assert_eq!(map.count(), 1);
//! ```
//!
//! ## Thread Safety
//!
//! [`ConcurrentMap`] is `Send + Sync` whenever its key, value and hasher are.
//! Share it through an `Arc`; no caller-side locking is needed.
//!
//! ## Consistency
//!
//! Operations on the same key are linearizable. [`ConcurrentMap::count`] is
//! exact once all mutating calls have returned. Traversals are weakly
//! consistent: an entry changed during a traversal may or may not be seen.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod map;
pub mod metrics;
pub mod store;

pub use crate::map::{ConcurrentMap, Entry, MapConfig};
pub use crate::metrics::{MapMetrics, MetricsCollector};
pub use crate::store::ShardedStore;

/// Common utilities and helper types
pub mod util {
    /// Cache line size for alignment purposes
    pub const CACHE_LINE_SIZE: usize = 64;

    /// Pad a value to a full cache line so neighbouring shards don't false-share
    #[repr(align(64))]
    #[derive(Default)]
    pub struct CachePadded<T> {
        value: T,
    }

    impl<T> CachePadded<T> {
        /// Create a new cache-padded value
        #[inline]
        pub const fn new(value: T) -> Self {
            Self { value }
        }

        /// Get the inner value
        #[inline]
        pub fn into_inner(self) -> T {
            self.value
        }
    }

    impl<T> core::ops::Deref for CachePadded<T> {
        type Target = T;

        #[inline]
        fn deref(&self) -> &T {
            &self.value
        }
    }

    impl<T> core::ops::DerefMut for CachePadded<T> {
        #[inline]
        fn deref_mut(&mut self) -> &mut T {
            &mut self.value
        }
    }

    impl<T: core::fmt::Debug> core::fmt::Debug for CachePadded<T> {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            core::fmt::Debug::fmt(&self.value, f)
        }
    }
}

/// Error types for cmap operations
///
/// Map operations themselves never fail; only construction from a
/// [`MapConfig`] can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Requested shard count is zero or larger than [`store::MAX_SHARDS`]
    #[error("invalid shard count {requested}: must be between 1 and {max}")]
    InvalidShardCount {
        /// The shard count that was asked for
        requested: usize,
        /// The largest shard count supported
        max: usize,
    },
}

/// Result type for cmap operations
pub type Result<T> = core::result::Result<T, Error>;
