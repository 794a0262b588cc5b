//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pagetree::{
    BufferPoolConfig, BufferPoolManager, IndexSpace, PageId, PageRef, PageStore, Result,
};
use tempfile::TempDir;

/// Install a test subscriber once; `RUST_LOG=pagetree=debug` shows splits.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A buffer pool in a fresh temporary directory.
pub fn create_bpm(pool_size: usize) -> (BufferPoolManager, TempDir) {
    let dir = TempDir::new().unwrap();
    let bpm = open_bpm(&dir, pool_size);
    (bpm, dir)
}

/// Open a buffer pool over an existing directory.
pub fn open_bpm(dir: &TempDir, pool_size: usize) -> BufferPoolManager {
    BufferPoolManager::open(BufferPoolConfig::new(pool_size, dir.path()).with_sync_writes(false))
        .unwrap()
}

/// A [`PageStore`] that records every call it forwards to a buffer pool.
///
/// Pins are counted per page so tests can assert that each get/create was
/// matched by exactly one unpin. `fail_get_after(n)` makes every `get_page`
/// after the first `n` calls fail with `PageNotFound`, and
/// `fail_create_after(n)` makes every `create_page` after the first `n` calls
/// fail with `NoFreeFrames`.
pub struct RecordingStore {
    inner: BufferPoolManager,
    pins: Mutex<HashMap<(IndexSpace, PageId), i64>>,
    pub gets: AtomicUsize,
    pub creates: AtomicUsize,
    pub dirty_marks: AtomicUsize,
    pub root_updates: AtomicUsize,
    fail_get_after: AtomicUsize,
    fail_create_after: AtomicUsize,
}

impl RecordingStore {
    pub fn new(inner: BufferPoolManager) -> Self {
        Self {
            inner,
            pins: Mutex::new(HashMap::new()),
            gets: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            dirty_marks: AtomicUsize::new(0),
            root_updates: AtomicUsize::new(0),
            fail_get_after: AtomicUsize::new(usize::MAX),
            fail_create_after: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn inner(&self) -> &BufferPoolManager {
        &self.inner
    }

    pub fn fail_get_after(&self, calls: usize) {
        self.fail_get_after.store(calls, Ordering::SeqCst);
    }

    pub fn fail_create_after(&self, calls: usize) {
        self.fail_create_after.store(calls, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        self.fail_get_after.store(usize::MAX, Ordering::SeqCst);
        self.fail_create_after.store(usize::MAX, Ordering::SeqCst);
    }

    /// Pages whose pins and unpins do not balance.
    pub fn unbalanced(&self) -> Vec<(IndexSpace, PageId, i64)> {
        self.pins
            .lock()
            .iter()
            .filter(|(_, &count)| count != 0)
            .map(|(&(space, page_id), &count)| (space, page_id, count))
            .collect()
    }

    fn track(&self, page_id: PageId, space: IndexSpace, delta: i64) {
        *self.pins.lock().entry((space, page_id)).or_insert(0) += delta;
    }
}

impl PageStore for RecordingStore {
    fn get_root_page_id(&self, space: IndexSpace) -> Result<Option<PageId>> {
        self.inner.get_root_page_id(space)
    }

    fn set_root_page_id(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        self.root_updates.fetch_add(1, Ordering::SeqCst);
        self.inner.set_root_page_id(page_id, space)
    }

    fn create_page(&self, space: IndexSpace) -> Result<PageRef<'_>> {
        if self.creates.load(Ordering::SeqCst) >= self.fail_create_after.load(Ordering::SeqCst) {
            return Err(pagetree::Error::NoFreeFrames);
        }
        let page = self.inner.create_page(space)?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.track(page.page_id(), space, 1);
        Ok(page)
    }

    fn get_page(&self, page_id: PageId, space: IndexSpace) -> Result<PageRef<'_>> {
        let calls = self.gets.fetch_add(1, Ordering::SeqCst);
        if calls >= self.fail_get_after.load(Ordering::SeqCst) {
            return Err(pagetree::Error::PageNotFound { page_id, space });
        }
        let page = self.inner.get_page(page_id, space)?;
        self.track(page_id, space, 1);
        Ok(page)
    }

    fn mark_dirty(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        self.dirty_marks.fetch_add(1, Ordering::SeqCst);
        self.inner.mark_dirty(page_id, space)
    }

    fn unpin_page(&self, page_id: PageId, space: IndexSpace) -> Result<()> {
        self.track(page_id, space, -1);
        self.inner.unpin_page(page_id, space)
    }
}

/// Movie id in the `tt0000001` form.
pub fn movie_id(n: u32) -> String {
    format!("tt{:07}", n)
}
