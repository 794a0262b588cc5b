//! Integration tests for the buffer pool manager.
//!
//! These tests verify cross-component behavior that unit tests don't cover.

mod common;

use std::sync::Arc;
use std::thread;

use common::{create_bpm, open_bpm};
use pagetree::{DiskManager, IndexSpace, PageId, PageStore};
use tempfile::tempdir;

const SPACE: IndexSpace = IndexSpace(1);

/// Test data persistence across multiple eviction cycles.
#[test]
fn test_data_persistence_across_evictions() {
    let (bpm, _dir) = create_bpm(2);

    // Create 5 pages with unique data (forces evictions)
    let mut page_ids = vec![];
    for i in 0u8..5 {
        let mut guard = bpm.new_page(SPACE).unwrap();
        guard.body_mut()[0] = i;
        guard.body_mut()[1] = i.wrapping_mul(3);
        page_ids.push(guard.page_id());
    }

    // Read all back - verifies evicted pages were flushed
    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid, SPACE).unwrap();
        assert_eq!(guard.body()[0], i as u8);
        assert_eq!(guard.body()[1], (i as u8).wrapping_mul(3));
    }
}

/// Test flush and reload across BPM instances, root pointer included.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let data = b"persistent!";

    let pid;

    // First session: create, write and publish as root
    {
        let bpm = open_bpm(&dir, 10);

        let mut guard = bpm.new_page(SPACE).unwrap();
        pid = guard.page_id();
        guard.body_mut()[..data.len()].copy_from_slice(data);
        drop(guard);

        bpm.set_root_page_id(pid, SPACE).unwrap();
        bpm.flush_all_pages().unwrap();
    }

    assert!(dir.path().join(DiskManager::file_name(SPACE)).exists());

    // Second session: verify data
    {
        let bpm = open_bpm(&dir, 10);

        assert_eq!(bpm.get_root_page_id(SPACE).unwrap(), Some(pid));
        let guard = bpm.fetch_page_read(pid, SPACE).unwrap();
        assert_eq!(&guard.body()[..data.len()], data);
    }
}

/// Pages written through the manual protocol reach disk on eviction.
#[test]
fn test_manual_protocol_write_back() {
    let (bpm, _dir) = create_bpm(3);

    let pid = {
        let page = bpm.create_page(SPACE).unwrap();
        page.write().body_mut()[7] = 0x77;
        bpm.mark_dirty(page.page_id(), SPACE).unwrap();
        bpm.unpin_page(page.page_id(), SPACE).unwrap();
        page.page_id()
    };

    // Cycle enough pages through the pool to evict `pid`.
    for _ in 0..6 {
        let _ = bpm.new_page(IndexSpace(2)).unwrap();
    }
    assert_eq!(bpm.pin_count(pid, SPACE), None);

    let page = bpm.get_page(pid, SPACE).unwrap();
    assert_eq!(page.read().body()[7], 0x77);
    bpm.unpin_page(pid, SPACE).unwrap();
    assert_eq!(bpm.stats().snapshot().outstanding_pins(), 0);
}

/// Test concurrent writers to different pages.
#[test]
fn test_concurrent_writers() {
    let (bpm, _dir) = create_bpm(10);
    let bpm = Arc::new(bpm);

    let page_ids: Vec<PageId> = (0..5)
        .map(|_| bpm.new_page(SPACE).unwrap().page_id())
        .collect();

    let mut handles = vec![];

    for (i, pid) in page_ids.iter().enumerate() {
        let bpm_clone = Arc::clone(&bpm);
        let pid = *pid;

        handles.push(thread::spawn(move || {
            for j in 0..50 {
                let mut guard = bpm_clone.fetch_page_write(pid, SPACE).unwrap();
                guard.body_mut()[0] = ((i * 50 + j) % 256) as u8;
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // Verify each page has last written value
    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid, SPACE).unwrap();
        assert_eq!(guard.body()[0], ((i * 50 + 49) % 256) as u8);
    }
}

/// Readers racing evictions always see the bytes of the page they asked for.
#[test]
fn test_concurrent_fetches_under_eviction() {
    const PAGES: usize = 32;
    const THREADS: usize = 4;
    const ROUNDS: usize = 500;

    fn stamp_of(body: &[u8]) -> u32 {
        u32::from_le_bytes([body[0], body[1], body[2], body[3]])
    }

    let (bpm, _dir) = create_bpm(8);
    let bpm = Arc::new(bpm);

    let page_ids: Arc<Vec<PageId>> = Arc::new(
        (0..PAGES)
            .map(|_| {
                let mut guard = bpm.new_page(SPACE).unwrap();
                let pid = guard.page_id();
                guard.body_mut()[..4].copy_from_slice(&pid.0.to_le_bytes());
                pid
            })
            .collect(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let bpm = Arc::clone(&bpm);
            let page_ids = Arc::clone(&page_ids);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let pid = page_ids[(t * 7 + round * 13) % PAGES];
                    match round % 3 {
                        0 => {
                            let guard = bpm.fetch_page_read(pid, SPACE).unwrap();
                            assert_eq!(stamp_of(guard.body()), pid.0, "read guard");
                        }
                        1 => {
                            let mut guard = bpm.fetch_page_write(pid, SPACE).unwrap();
                            assert_eq!(stamp_of(guard.body()), pid.0, "write guard");
                            guard.body_mut()[..4].copy_from_slice(&pid.0.to_le_bytes());
                        }
                        _ => {
                            let page = bpm.get_page(pid, SPACE).unwrap();
                            assert_eq!(stamp_of(page.read().body()), pid.0, "manual pin");
                            bpm.unpin_page(pid, SPACE).unwrap();
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(bpm.stats().snapshot().outstanding_pins(), 0);
    assert!(bpm.page_count() <= bpm.pool_size());
    for &pid in page_ids.iter() {
        let guard = bpm.fetch_page_read(pid, SPACE).unwrap();
        assert_eq!(stamp_of(guard.body()), pid.0);
    }
}

/// Test stats accuracy under load.
#[test]
fn test_stats_accuracy() {
    let (bpm, _dir) = create_bpm(2);

    let pid = bpm.new_page(SPACE).unwrap().page_id();

    // Multiple fetches = cache hits
    for _ in 0..5 {
        let _ = bpm.fetch_page_read(pid, SPACE).unwrap();
    }

    let stats = bpm.stats().snapshot();
    assert!(stats.cache_hits >= 5);
    assert_eq!(stats.pages_created, 1);

    // Force eviction
    let _ = bpm.new_page(SPACE).unwrap();
    let _ = bpm.new_page(SPACE).unwrap();

    let stats = bpm.stats().snapshot();
    assert!(stats.evictions >= 1);
    assert_eq!(stats.outstanding_pins(), 0);
}
