// Multi-level cache module
// Author: kelexine (https://github.com/kelexine)

pub mod keys;
pub mod lru;
pub mod store;
pub mod tiered;

pub use lru::{BoundedTtlCache, CacheStats};
pub use store::{MemoryStore, RemoteStore};
pub use tiered::{fetcher, Fetcher, TieredCache, TieredStats};
