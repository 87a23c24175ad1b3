//! Short code to URL caches for the Tinylink resolution path.

pub mod lookup;
pub mod moka;
pub mod redis;

pub use lookup::{LookupCache, LookupCacheSettings};
pub use self::moka::MokaUrlCache;
pub use self::redis::RedisUrlCache;
pub use tinylink_core::{CacheError, UrlCache};
