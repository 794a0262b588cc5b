//! Page identifier type.

use std::fmt;

use crate::common::config::PAGE_ID_SIZE;
use crate::common::FixedWidth;

/// Identifies a page inside one index space.
///
/// Page 0 of every index space is its meta page; tree nodes start at 1.
///
/// # Example
/// ```
/// use pagetree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Used on disk for "no root yet" and "no next leaf".
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The meta page of an index space.
    pub const META: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Map the sentinel to `None`.
    #[inline]
    pub fn into_option(self) -> Option<PageId> {
        self.is_valid().then_some(self)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

impl FixedWidth for PageId {
    const WIDTH: usize = PAGE_ID_SIZE;

    fn write_to(&self, buf: &mut [u8]) {
        self.0.write_to(buf);
    }

    fn read_from(buf: &[u8]) -> Self {
        PageId(u32::read_from(buf))
    }
}
