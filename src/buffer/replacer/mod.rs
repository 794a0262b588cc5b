//! Eviction policy used by the buffer pool.
//!
//! - [`LruReplacer`] - evicts the least recently accessed unpinned frame

mod lru;

pub use lru::LruReplacer;
