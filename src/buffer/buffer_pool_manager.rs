//! Buffer Pool Manager - the page cache shared by every index space.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory, one file per index space
//! - Pin-based reference counting, through RAII guards or the manual
//!   [`PageStore`] protocol
//! - Dirty page write-back on eviction and flush
//! - Root pointer persistence in each space's meta page

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageRef, PageStore, PageWriteGuard};
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, FrameId, IndexSpace, PageId, PageKey, Result};
use crate::storage::page::{MetaPage, Page};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames caching pages of many index spaces.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  ┌────────────────┐  ┌───────────────────────────────────┐   │
/// │  │  page_table    │  │        frames: Vec<Frame>         │   │
/// │  │ PageKey → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └────────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │
/// │  │  free_list   │  │   replacer   │  │      disks       │    │
/// │  │ Vec<FrameId> │  │ LruReplacer  │  │ space → DiskMgr  │    │
/// │  └──────────────┘  └──────────────┘  └──────────────────┘    │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock` (many readers, few writers)
/// - `free_list`, `replacer`, `disks`: `Mutex`
/// - `frames`: fixed size, each Frame has internal locks
/// - `stats`: atomic counters
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<HashMap<PageKey, FrameId>>,
    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<LruReplacer>,
    /// One disk manager per index space, opened on first use.
    disks: Mutex<HashMap<IndexSpace, DiskManager>>,
    config: BufferPoolConfig,
    stats: BufferPoolStats,
}

impl BufferPoolManager {
    /// Create a buffer pool over `config.data_dir`, creating the directory if
    /// needed. Index space files are opened lazily.
    pub fn open(config: BufferPoolConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let frames = (0..config.pool_size).map(|_| Frame::new()).collect();
        let free_list = (0..config.pool_size).map(FrameId::new).collect();

        debug!(
            pool_size = config.pool_size,
            data_dir = %config.data_dir.display(),
            "buffer pool opened"
        );

        Ok(Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruReplacer::new()),
            disks: Mutex::new(HashMap::new()),
            config,
            stats: BufferPoolStats::new(),
        })
    }

    // ========================================================================
    // Public API: guarded access
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId, space: IndexSpace) -> Result<PageReadGuard<'_>> {
        let key = PageKey::new(space, page_id);
        let frame_id = self.fetch_frame(key)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, key, lock))
    }

    /// Fetch a page for writing (exclusive access, dirty on drop).
    pub fn fetch_page_write(
        &self,
        page_id: PageId,
        space: IndexSpace,
    ) -> Result<PageWriteGuard<'_>> {
        let key = PageKey::new(space, page_id);
        let frame_id = self.fetch_frame(key)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, key, lock))
    }

    /// Allocate a new page in `space` and return a write guard for it.
    pub fn new_page(&self, space: IndexSpace) -> Result<PageWriteGuard<'_>> {
        let (frame_id, key) = self.allocate_frame(space)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, key, lock))
    }

    /// Drop a page from the pool without deallocating it on disk.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the page is still pinned.
    pub fn delete_page(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        let key = PageKey::new(space, page_id);
        let mut pt = self.page_table.write();

        let frame_id = match pt.get(&key) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PageNotPinned { page_id, space });
        }

        pt.remove(&key);
        drop(pt);

        frame.set_key(None);
        frame.clear_dirty();
        self.replacer.lock().remove(frame_id);
        self.free_list.lock().push(frame_id);

        Ok(())
    }

    // ========================================================================
    // Public API: flush
    // ========================================================================

    /// Flush a specific page to disk if it's dirty.
    pub fn flush_page(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        let key = PageKey::new(space, page_id);
        let pt = self.page_table.read();
        let frame_id = match pt.get(&key) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        self.flush_frame(frame_id, key)
    }

    /// Flush all dirty pages to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        // The read lock keeps every listed page in its frame until flushed.
        let pt = self.page_table.read();
        for (&key, &frame_id) in pt.iter() {
            self.flush_frame(frame_id, key)?;
        }

        Ok(())
    }

    // ========================================================================
    // Public API: stats and introspection
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of resident pages across all spaces.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Pin count of a resident page, `None` if the page is not in the pool.
    pub fn pin_count(&self, page_id: PageId, space: IndexSpace) -> Option<u32> {
        let key = PageKey::new(space, page_id);
        let pt = self.page_table.read();
        let frame_id = *pt.get(&key)?;
        Some(self.frames[frame_id.0].pin_count())
    }

    /// Pages allocated on disk for `space`, including its meta page.
    pub fn space_page_count(&self, space: IndexSpace) -> Result<u32> {
        self.with_disk(space, |dm| Ok(dm.page_count()))
    }

    // ========================================================================
    // Internal: pin release
    // ========================================================================

    /// Release one pin on a frame. Called by the page guards on drop.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];
        if is_dirty {
            frame.mark_dirty();
        }
        // Guards pin exactly once, so their unpin cannot underflow.
        if let Some(remaining) = frame.try_unpin() {
            BufferPoolStats::bump(&self.stats.unpins);
            if remaining == 0 {
                self.replacer.lock().set_evictable(frame_id, true);
            }
        }
    }

    // ========================================================================
    // Internal: fetch and allocation
    // ========================================================================

    /// Bring a page into the pool and pin it.
    fn fetch_frame(&self, key: PageKey) -> Result<FrameId> {
        if !key.page_id.is_valid() {
            return Err(Error::InvalidPageId(key.page_id));
        }

        // Fast path: pin under the read lock so the frame cannot be
        // evicted between lookup and pin.
        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&key) {
                self.pin_frame(frame_id);
                BufferPoolStats::bump(&self.stats.cache_hits);
                return Ok(frame_id);
            }
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        let frame_id = self.get_free_frame()?;

        let page_data = match self.with_disk(key.space, |dm| dm.read_page(key.page_id)) {
            Ok(page) => page,
            Err(err) => {
                self.free_list.lock().push(frame_id);
                return Err(err);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_read);

        let frame = &self.frames[frame_id.0];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        let frame_id = self.install(frame_id, key);

        trace!(page = %key, frame = %frame_id, "page loaded");
        Ok(frame_id)
    }

    /// Allocate a fresh page in `space` and install it pinned.
    fn allocate_frame(&self, space: IndexSpace) -> Result<(FrameId, PageKey)> {
        let frame_id = self.get_free_frame()?;

        let page_id = match self.with_disk(space, |dm| dm.allocate_page()) {
            Ok(page_id) => page_id,
            Err(err) => {
                self.free_list.lock().push(frame_id);
                return Err(err);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_created);

        let key = PageKey::new(space, page_id);
        self.frames[frame_id.0].page_mut().reset();
        let frame_id = self.install(frame_id, key);

        trace!(page = %key, frame = %frame_id, "page created");
        Ok((frame_id, key))
    }

    /// Tag a frame with its page, pin it, and publish it in the page table.
    ///
    /// If another thread loaded the same page first, that frame is pinned
    /// and returned instead, and `frame_id` goes back to the free list.
    fn install(&self, frame_id: FrameId, key: PageKey) -> FrameId {
        let mut pt = self.page_table.write();
        if let Some(&resident) = pt.get(&key) {
            self.pin_frame(resident);
            drop(pt);
            self.free_list.lock().push(frame_id);
            return resident;
        }

        let frame = &self.frames[frame_id.0];
        frame.set_key(Some(key));
        frame.clear_dirty();
        self.pin_frame(frame_id);
        pt.insert(key, frame_id);
        frame_id
    }

    fn pin_frame(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();
        BufferPoolStats::bump(&self.stats.pins);

        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    // ========================================================================
    // Internal: frame allocation and eviction
    // ========================================================================

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        self.evict_page()
    }

    /// Evict the least recently used unpinned page and return its frame.
    ///
    /// Lock order is page table before replacer; the replacer lock is never
    /// held while the page table is taken.
    fn evict_page(&self) -> Result<FrameId> {
        loop {
            let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;
            let frame = &self.frames[frame_id.0];

            // Pins are only taken under the page table lock, so the count
            // cannot rise while the write lock is held.
            let mut pt = self.page_table.write();
            if frame.is_pinned() {
                // Pinned again after the replacer offered it: keep it tracked
                // and try the next victim.
                self.replacer.lock().record_access(frame_id);
                continue;
            }

            if let Some(key) = frame.key() {
                if let Err(err) = self.flush_frame(frame_id, key) {
                    // Flush failed: the frame stays resident, dirty and evictable.
                    let mut replacer = self.replacer.lock();
                    replacer.record_access(frame_id);
                    replacer.set_evictable(frame_id, true);
                    return Err(err);
                }
                pt.remove(&key);
                trace!(page = %key, frame = %frame_id, "page evicted");
            }
            drop(pt);

            BufferPoolStats::bump(&self.stats.evictions);
            frame.clear_dirty();
            frame.set_key(None);
            return Ok(frame_id);
        }
    }

    fn flush_frame(&self, frame_id: FrameId, key: PageKey) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            let page = frame.page();
            self.with_disk(key.space, |dm| dm.write_page(key.page_id, &page))?;
            drop(page);

            frame.clear_dirty();
            BufferPoolStats::bump(&self.stats.pages_written);
        }

        Ok(())
    }

    /// Run `f` against the disk manager of `space`, opening (and formatting)
    /// the space file on first use.
    fn with_disk<T>(
        &self,
        space: IndexSpace,
        f: impl FnOnce(&mut DiskManager) -> Result<T>,
    ) -> Result<T> {
        let mut disks = self.disks.lock();

        let dm = match disks.entry(space) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.config.data_dir.join(DiskManager::file_name(space));
                let mut dm = DiskManager::open_or_create(&path, space)?
                    .with_sync_writes(self.config.sync_writes);

                if dm.page_count() == 0 {
                    let meta_id = dm.allocate_page()?;
                    let mut meta = Page::new();
                    MetaPage::init(&mut meta);
                    dm.write_page(meta_id, &meta)?;
                    debug!(%space, "formatted new index space");
                }
                entry.insert(dm)
            }
        };

        f(dm)
    }
}

impl PageStore for BufferPoolManager {
    fn get_root_page_id(&self, space: IndexSpace) -> Result<Option<PageId>> {
        let guard = self.fetch_page_read(PageId::META, space)?;
        MetaPage::root(&guard, guard.key())
    }

    fn set_root_page_id(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        let mut guard = self.fetch_page_write(PageId::META, space)?;
        let key = guard.key();
        MetaPage::set_root(&mut guard, key, page_id)?;
        debug!(%space, root = %page_id, "root pointer updated");
        Ok(())
    }

    fn create_page(&self, space: IndexSpace) -> Result<PageRef<'_>> {
        let (frame_id, key) = self.allocate_frame(space)?;
        // A fresh page must reach disk even if nobody writes to it.
        self.frames[frame_id.0].mark_dirty();
        Ok(PageRef::new(key.page_id, self.frames[frame_id.0].page_lock()))
    }

    fn get_page(&self, page_id: PageId, space: IndexSpace) -> Result<PageRef<'_>> {
        let frame_id = self.fetch_frame(PageKey::new(space, page_id))?;
        Ok(PageRef::new(page_id, self.frames[frame_id.0].page_lock()))
    }

    fn mark_dirty(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        let pt = self.page_table.read();
        let frame_id = *pt
            .get(&PageKey::new(space, page_id))
            .ok_or(Error::PageNotPinned { page_id, space })?;

        let frame = &self.frames[frame_id.0];
        if !frame.is_pinned() {
            return Err(Error::PageNotPinned { page_id, space });
        }
        frame.mark_dirty();
        Ok(())
    }

    fn unpin_page(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        let pt = self.page_table.read();
        let frame_id = *pt
            .get(&PageKey::new(space, page_id))
            .ok_or(Error::PageNotPinned { page_id, space })?;

        let remaining = self.frames[frame_id.0]
            .try_unpin()
            .ok_or(Error::PageNotPinned { page_id, space })?;
        BufferPoolStats::bump(&self.stats.unpins);

        if remaining == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
        Ok(())
    }
}
