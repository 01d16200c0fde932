//! Map implementations
//!
//! This module provides the counted concurrent map and its traversal types.
//!
//! ## Available Types
//!
//! - [`ConcurrentMap`]: thread-safe hash map with an exact live count
//! - [`MapConfig`]: shard layout, capacity and metrics settings
//! - [`Iter`], [`Keys`], [`Values`]: weakly consistent pull iterators
//!
//! ## Choosing a Shard Count
//!
//! - The default (four shards per CPU) suits most workloads
//! - Raise it when many threads write disjoint keys at high rates
//! - A single shard behaves like one `RwLock<HashMap>` plus a counter

pub mod concurrent;
pub mod config;
pub mod iter;

pub use self::concurrent::ConcurrentMap;
pub use self::config::MapConfig;
pub use self::iter::{Entry, Iter, Keys, Values};

// Include test modules
#[cfg(test)]
mod tests;

#[cfg(test)]
mod proptests;
