//! Error types for pagetree.

use thiserror::Error;

use crate::common::{IndexSpace, PageId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pagetree.
///
/// Page store failures (`Io` through `PageNotPinned`) are propagated by the
/// B+Tree unchanged. `Corrupted` and `CapacityExceeded` are structural faults
/// and are never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in its index space.
    #[error("{page_id} not found in {space}")]
    PageNotFound { page_id: PageId, space: IndexSpace },

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The provided page ID cannot address a page (e.g. the sentinel).
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// Attempted to unpin a page that wasn't pinned, or to delete a pinned one.
    ///
    /// This indicates a bug - unpinning should match pinning.
    #[error("{page_id} in {space} has unbalanced pins")]
    PageNotPinned { page_id: PageId, space: IndexSpace },

    /// A caller supplied an argument outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Range search bounds were given in descending order.
    #[error("Invalid range: start key {start} is greater than end key {end}")]
    InvalidRange { start: String, end: String },

    /// Page content does not describe a valid index node.
    #[error("{page_id} in {space} is corrupted: {reason}")]
    Corrupted {
        page_id: PageId,
        space: IndexSpace,
        reason: String,
    },

    /// A node holds more entries than one split step can absorb.
    #[error("{page_id} in {space} holds {len} entries, capacity is {capacity}")]
    CapacityExceeded {
        page_id: PageId,
        space: IndexSpace,
        len: usize,
        capacity: usize,
    },
}
