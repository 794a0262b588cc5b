//! Disk Manager - file I/O for the pages of one index space.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, IndexSpace, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single index space file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ (meta)  │ (node)  │         │ (node)  │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// `DiskManager` is single-threaded; the `BufferPoolManager` serializes
/// access to it.
pub struct DiskManager {
    file: File,
    space: IndexSpace,
    /// Number of pages in the file.
    page_count: u32,
    /// fsync after each write and allocation.
    sync_writes: bool,
}

impl DiskManager {
    /// File name used for an index space inside a data directory.
    pub fn file_name(space: IndexSpace) -> PathBuf {
        PathBuf::from(format!("index_{}.db", space.0))
    }

    /// Create a new index space file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, space: IndexSpace) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            space,
            page_count: 0,
            sync_writes: true,
        })
    }

    /// Open an existing index space file.
    pub fn open<P: AsRef<Path>>(path: P, space: IndexSpace) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            space,
            page_count,
            sync_writes: true,
        })
    }

    /// Open the file if it exists, create it otherwise.
    pub fn open_or_create<P: AsRef<Path>>(path: P, space: IndexSpace) -> Result<Self> {
        let dm = if path.as_ref().exists() {
            Self::open(&path, space)?
        } else {
            Self::create(&path, space)?
        };
        debug!(%space, path = %path.as_ref().display(), pages = dm.page_count, "opened index space");
        Ok(dm)
    }

    /// Toggle fsync after writes.
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_allocated(page_id)?;

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_allocated(page_id)?;

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(page.as_slice())?;
        if self.sync_writes {
            self.file.sync_all()?;
        }

        Ok(())
    }

    /// Extend the file by one zeroed page and return its id.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.page_count);
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        if self.sync_writes {
            self.file.sync_all()?;
        }

        self.page_count += 1;
        Ok(page_id)
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn space(&self) -> IndexSpace {
        self.space
    }

    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }

    fn check_allocated(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound {
                page_id,
                space: self.space,
            });
        }
        Ok(())
    }

    #[inline]
    fn offset(page_id: PageId) -> u64 {
        (page_id.0 as u64) * (PAGE_SIZE as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SPACE: IndexSpace = IndexSpace(7);

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        DiskManager::create(&path, SPACE).unwrap();
        assert!(DiskManager::create(&path, SPACE).is_err());
    }

    #[test]
    fn test_allocate_write_read() {
        let dir = tempdir().unwrap();
        let mut dm = DiskManager::create(dir.path().join("test.db"), SPACE)
            .unwrap()
            .with_sync_writes(false);

        let page_id = dm.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(0));

        let mut page = Page::new();
        page.as_mut_slice()[4095] = 0xEF;
        dm.write_page(page_id, &page).unwrap();

        assert_eq!(dm.read_page(page_id).unwrap().as_slice()[4095], 0xEF);
        assert_eq!(dm.file_size(), PAGE_SIZE as u64);
    }

    #[test]
    fn test_persistence_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DiskManager::file_name(SPACE));

        {
            let mut dm = DiskManager::open_or_create(&path, SPACE).unwrap();
            let page_id = dm.allocate_page().unwrap();
            let mut page = Page::new();
            page.as_mut_slice()[0] = 0x42;
            dm.write_page(page_id, &page).unwrap();
        }

        let mut dm = DiskManager::open_or_create(&path, SPACE).unwrap();
        assert_eq!(dm.page_count(), 1);
        assert_eq!(dm.read_page(PageId::new(0)).unwrap().as_slice()[0], 0x42);
    }

    #[test]
    fn test_missing_page_reports_space() {
        let dir = tempdir().unwrap();
        let mut dm = DiskManager::create(dir.path().join("test.db"), SPACE).unwrap();

        match dm.read_page(PageId::new(1)) {
            Err(Error::PageNotFound { page_id, space }) => {
                assert_eq!(page_id, PageId::new(1));
                assert_eq!(space, SPACE);
            }
            other => panic!("expected PageNotFound, got {:?}", other.map(|_| ())),
        }
        assert!(dm.write_page(PageId::new(0), &Page::new()).is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(DiskManager::file_name(IndexSpace(3)), PathBuf::from("index_3.db"));
    }
}
