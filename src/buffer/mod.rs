//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between the index and disk. It
//! manages a fixed pool of frames, each holding one page of one index space.
//!
//! # Components
//! - [`PageStore`] / [`PageRef`] - The pin/dirty/unpin contract the B+Tree uses
//! - [`BufferPoolManager`] - The page cache, implementing [`PageStore`]
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Performance and pin accounting counters
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
mod page_store;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use page_store::{PageRef, PageStore};
pub use stats::{BufferPoolStats, StatsSnapshot};
