//! RAII guards for page access.
//!
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (marks dirty on drop)
//!
//! Both guards hold the frame's lock for their whole lifetime and unpin the
//! page when dropped. The B+Tree does not use them; it follows the manual
//! [`PageStore`](super::PageStore) protocol. They serve the meta page and
//! direct page users.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId, PageKey};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only page access.
///
/// Any number of read guards may share a page. The page is unpinned when the
/// guard drops.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id, space)?;
/// let data = guard.as_slice();
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    /// Pool to unpin against on drop.
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    key: PageKey,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    /// Create a read guard over an already pinned frame.
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        key: PageKey,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            key,
            lock,
        }
    }

    /// Index space and page id of the guarded page.
    #[inline]
    pub fn key(&self) -> PageKey {
        self.key
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.key.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        // Readers never dirty the page.
        self.bpm.unpin_frame(self.frame_id, false);
    }
}

/// Guard for exclusive write access to a page.
///
/// The page is marked dirty and unpinned when the guard drops.
pub struct PageWriteGuard<'a> {
    /// Pool to unpin against on drop.
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    key: PageKey,
    lock: RwLockWriteGuard<'a, Page>,
}

impl<'a> PageWriteGuard<'a> {
    /// Create a write guard over an already pinned frame.
    ///
    /// Called by `fetch_page_write()` and `new_page()`.
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        key: PageKey,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            key,
            lock,
        }
    }

    /// Index space and page id of the guarded page.
    #[inline]
    pub fn key(&self) -> PageKey {
        self.key
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.key.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_frame(self.frame_id, true);
    }
}
