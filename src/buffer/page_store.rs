//! The page store contract the B+Tree is written against.
//!
//! This is the manual pin protocol: every [`PageStore::get_page`] or
//! [`PageStore::create_page`] pins a page and must be matched by exactly one
//! [`PageStore::unpin_page`]. The B+Tree wraps each pin in a scoped guard so
//! the matching unpin happens on every exit path.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{IndexSpace, PageId, Result};
use crate::storage::page::Page;

/// A pinned page handed out by a [`PageStore`].
///
/// The reference stays valid while the pin is held: the store must not
/// evict or reuse the underlying frame until `unpin_page` is called.
#[derive(Clone, Copy)]
pub struct PageRef<'a> {
    page_id: PageId,
    page: &'a RwLock<Page>,
}

impl<'a> PageRef<'a> {
    pub fn new(page_id: PageId, page: &'a RwLock<Page>) -> Self {
        Self { page_id, page }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Shared access to the page bytes.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'a, Page> {
        self.page.read()
    }

    /// Exclusive access to the page bytes.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'a, Page> {
        self.page.write()
    }
}

/// Allocation, pinning and root bookkeeping for index pages.
///
/// Guarantees expected from implementors:
/// - a pinned page is not evicted or reused underneath its holder;
/// - `mark_dirty` is idempotent and cumulative;
/// - `unpin_page` on a page that is not pinned is an error, never a silent
///   no-op.
///
/// Concurrent callers on the same index space must be serialized by the
/// caller or by the implementation; the B+Tree does not latch-couple.
pub trait PageStore {
    /// Current root of `space`, `None` when the tree has no root yet.
    fn get_root_page_id(&self, space: IndexSpace) -> Result<Option<PageId>>;

    /// Persist `page_id` as the root of `space`.
    fn set_root_page_id(&self, page_id: PageId, space: IndexSpace) -> Result<()>;

    /// Allocate a zeroed page with a fresh id in `space`, returned pinned.
    fn create_page(&self, space: IndexSpace) -> Result<PageRef<'_>>;

    /// Pin an existing page.
    ///
    /// # Errors
    /// `Error::PageNotFound` if `page_id` was never allocated in `space`.
    fn get_page(&self, page_id: PageId, space: IndexSpace) -> Result<PageRef<'_>>;

    /// Flag a pinned page as modified.
    fn mark_dirty(&self, page_id: PageId, space: IndexSpace) -> Result<()>;

    /// Release one pin.
    fn unpin_page(&self, page_id: PageId, space: IndexSpace) -> Result<()>;
}
