//! Scoped pins over the manual [`PageStore`] protocol.

use tracing::error;

use crate::buffer::{PageRef, PageStore};
use crate::common::{IndexSpace, PageId, PageKey, Result};

use super::key::{IndexKey, IndexValue};
use super::node::IndexNode;

/// One pin on one page, released exactly once when dropped.
///
/// Holding a `PinnedPage` does not hold the page latch: node reads and writes
/// take the lock only for the duration of decode or encode.
pub(crate) struct PinnedPage<'s, S: PageStore + ?Sized> {
    store: &'s S,
    space: IndexSpace,
    page: PageRef<'s>,
}

impl<'s, S: PageStore + ?Sized> PinnedPage<'s, S> {
    pub fn fetch(store: &'s S, page_id: PageId, space: IndexSpace) -> Result<Self> {
        let page = store.get_page(page_id, space)?;
        Ok(Self { store, space, page })
    }

    pub fn create(store: &'s S, space: IndexSpace) -> Result<Self> {
        let page = store.create_page(space)?;
        Ok(Self { store, space, page })
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page.page_id()
    }

    #[inline]
    pub fn key(&self) -> PageKey {
        PageKey::new(self.space, self.page.page_id())
    }

    pub fn read_node<K: IndexKey, V: IndexValue>(&self) -> Result<IndexNode<K, V>> {
        IndexNode::decode(&self.page.read(), self.key())
    }

    /// Encode `node` into the page and flag it dirty.
    pub fn write_node<K: IndexKey, V: IndexValue>(&self, node: &IndexNode<K, V>) -> Result<()> {
        node.encode(&mut self.page.write(), self.key())?;
        self.store.mark_dirty(self.page_id(), self.space)
    }
}

impl<S: PageStore + ?Sized> Drop for PinnedPage<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.store.unpin_page(self.page_id(), self.space) {
            error!(page = %self.key(), %err, "failed to unpin index page");
        }
    }
}
