//! Store implementations
//!
//! This module provides the raw concurrent key/value store that
//! [`ConcurrentMap`](crate::map::ConcurrentMap) layers its element count over.
//!
//! ## Available Stores
//!
//! - [`ShardedStore`]: striped `RwLock`ed hash shards
//!
//! ## Primitives
//!
//! Every mutating primitive reports the store's true before/after state in a
//! single locked step, so callers can keep derived state (such as a counter)
//! in sync without a separate membership check:
//!
//! | Primitive | Returns |
//! |-----------|---------|
//! | `swap` | previous value, if any |
//! | `store_if_absent` | whether the value was inserted |
//! | `load_or_store` | stored value, and whether it was already present |
//! | `load_and_delete` | removed value, if any |

pub mod sharded;

pub use self::sharded::{ShardedStore, MAX_SHARDS};
