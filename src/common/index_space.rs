//! Index space and fully-qualified page addresses.

use std::fmt;

use crate::common::PageId;

/// Names one independent index: its own pages, its own root pointer.
///
/// Each space is backed by its own file in the buffer pool's data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexSpace(pub u32);

impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Space({})", self.0)
    }
}

/// A page address that is unique across the whole page store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub space: IndexSpace,
    pub page_id: PageId,
}

impl PageKey {
    #[inline]
    pub fn new(space: IndexSpace, page_id: PageId) -> Self {
        Self { space, page_id }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.space, self.page_id)
    }
}
