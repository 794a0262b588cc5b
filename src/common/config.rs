//! Configuration for the page store and the B+Tree.
//!
//! Layout widths are compile-time constants shared by every index space.
//! Pool sizing and node capacities are runtime configuration.

use std::path::PathBuf;

use crate::common::{Error, FixedWidth, IndexSpace, Result};
use crate::index::btree::node;

/// Size of a page in bytes (4KB).
///
/// # Memory Layout
/// With 4KB pages and 32-bit PageIds:
/// - Max pages per index space: 2^32
/// - Max index space size: 16TB
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Maximum theoretical size of one index space file in bytes.
pub const MAX_DB_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

/// Width of a serialized page id.
pub const PAGE_ID_SIZE: usize = 4;

/// Width of a serialized record identifier (page id + slot id).
pub const RID_SIZE: usize = 8;

/// Width of a movie id key such as `tt0000001`.
pub const MOVIE_ID_SIZE: usize = 9;

/// Width of a movie title field.
pub const MOVIE_TITLE_SIZE: usize = 30;

/// Width of a person name field.
pub const PERSON_NAME_SIZE: usize = 105;

/// Index space holding the movie-id index.
pub const MOVIE_ID_INDEX: IndexSpace = IndexSpace(1);

/// Index space holding the title index.
pub const TITLE_INDEX: IndexSpace = IndexSpace(2);

/// Buffer pool settings.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
    /// Directory holding one file per index space.
    pub data_dir: PathBuf,
    /// fsync after every page write and allocation.
    pub sync_writes: bool,
}

impl BufferPoolConfig {
    /// Config with `pool_size` frames under `data_dir`, syncing every write.
    pub fn new(pool_size: usize, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool_size,
            data_dir: data_dir.into(),
            sync_writes: true,
        }
    }

    /// Toggle fsync on write.
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Reject configurations the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidArgument("pool_size must be > 0".into()));
        }
        Ok(())
    }
}

/// Node capacities of a B+Tree.
///
/// `leaf_max_entries` is the largest number of (key, value) pairs a leaf may
/// hold; `internal_max_children` the largest fan-out of an internal page.
/// A node that exceeds its capacity is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeConfig {
    pub leaf_max_entries: usize,
    pub internal_max_children: usize,
}

impl BTreeConfig {
    /// Smallest capacity that still lets a split leave both halves non-empty
    /// and promote a key out of an internal node.
    pub const MIN_CAPACITY: usize = 3;

    /// Capacities that fill a page for the given key and value types.
    pub fn for_types<K: FixedWidth, V: FixedWidth>() -> Self {
        Self {
            leaf_max_entries: node::max_leaf_entries::<K, V>(),
            internal_max_children: node::max_internal_children::<K>(),
        }
    }

    /// Explicit capacities, mostly useful to force splits in tests.
    pub fn with_capacities(leaf_max_entries: usize, internal_max_children: usize) -> Self {
        Self {
            leaf_max_entries,
            internal_max_children,
        }
    }

    /// Check the capacities against the physical page layout.
    pub fn validate<K: FixedWidth, V: FixedWidth>(&self) -> Result<()> {
        let leaf_limit = node::max_leaf_entries::<K, V>();
        let internal_limit = node::max_internal_children::<K>();

        if self.leaf_max_entries < Self::MIN_CAPACITY
            || self.internal_max_children < Self::MIN_CAPACITY
        {
            return Err(Error::InvalidArgument(format!(
                "node capacity must be at least {}",
                Self::MIN_CAPACITY
            )));
        }
        if self.leaf_max_entries > leaf_limit {
            return Err(Error::InvalidArgument(format!(
                "leaf capacity {} exceeds page limit {}",
                self.leaf_max_entries, leaf_limit
            )));
        }
        if self.internal_max_children > internal_limit {
            return Err(Error::InvalidArgument(format!(
                "internal capacity {} exceeds page limit {}",
                self.internal_max_children, internal_limit
            )));
        }
        Ok(())
    }
}
