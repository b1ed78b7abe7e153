//! TTL-bounded caching of path→ID and ID→object mappings.

pub mod key;
pub mod kv;
pub mod registry;
pub mod store;

pub use key::{CacheKey, KeyKind};
pub use kv::{KvStore, MemoryKvStore};
pub use registry::CacheBackends;
pub use store::{CacheStore, CachedObject};
