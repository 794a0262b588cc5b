//! Meta page: page 0 of every index space, holding the root pointer.
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! 0       13    PageHeader (PageType::Meta)
//! 13      4     magic "PGTR"
//! 17      4     root page id (PageId::INVALID when the tree is empty)
//! ```

use crate::common::{Error, FixedWidth, PageId, PageKey, Result};

use super::{Page, PageHeader, PageType};

const MAGIC: [u8; 4] = *b"PGTR";
const OFFSET_MAGIC: usize = 0;
const OFFSET_ROOT: usize = 4;

/// Stateless accessors over a meta page's bytes.
pub struct MetaPage;

impl MetaPage {
    /// Format `page` as a meta page with no root.
    pub fn init(page: &mut Page) {
        page.reset();
        page.set_header(&PageHeader::new(PageType::Meta));
        page.body_mut()[OFFSET_MAGIC..OFFSET_MAGIC + 4].copy_from_slice(&MAGIC);
        PageId::INVALID.write_to(&mut page.body_mut()[OFFSET_ROOT..]);
        page.update_checksum();
    }

    /// Read the root pointer, `None` if no root has been recorded.
    pub fn root(page: &Page, key: PageKey) -> Result<Option<PageId>> {
        Self::check(page, key)?;
        Ok(PageId::read_from(&page.body()[OFFSET_ROOT..]).into_option())
    }

    /// Record a new root pointer.
    pub fn set_root(page: &mut Page, key: PageKey, root: PageId) -> Result<()> {
        Self::check(page, key)?;
        root.write_to(&mut page.body_mut()[OFFSET_ROOT..]);
        page.update_checksum();
        Ok(())
    }

    fn check(page: &Page, key: PageKey) -> Result<()> {
        let corrupted = |reason: &str| Error::Corrupted {
            page_id: key.page_id,
            space: key.space,
            reason: reason.to_string(),
        };

        if page.header().page_type != PageType::Meta {
            return Err(corrupted("meta page has wrong page type"));
        }
        if page.body()[OFFSET_MAGIC..OFFSET_MAGIC + 4] != MAGIC {
            return Err(corrupted("meta page magic mismatch"));
        }
        if !page.verify_checksum() {
            return Err(corrupted("meta page checksum mismatch"));
        }
        Ok(())
    }
}
