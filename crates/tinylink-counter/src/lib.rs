//! Cluster-wide counter leasing for short code generation.
//!
//! A single counter lives in a coordination service and is only ever advanced
//! through a versioned compare-and-set. Each process leases a contiguous range
//! of values from it and hands them out locally, so the coordination service
//! sees one round trip per range instead of one per code.

pub mod allocator;
pub mod backend;
pub mod error;
mod path;
pub mod store;

pub use allocator::{AllocatorSettings, CounterLease, RangeAllocator};
pub use backend::{CoordinationBackend, InMemoryBackend, Node, RedisBackend, Version};
pub use error::{CounterError, Result};
pub use path::CounterPath;
pub use store::{CounterSettings, CounterStore};
