//! pagetree - disk-resident B+Tree indexes over a shared buffer pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pagetree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Index Layer (index/)                    │   │
//! │  │      BPlusTree: insert, search, range_search, Cursor    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓ PageStore                        │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                    │   │
//! │  │   BufferPoolManager + Frame + LRU replacer + Statistics │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                 │   │
//! │  │   DiskManager per index space + Page + PageHeader       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, IndexSpace, Error, config)
//! - [`buffer`] - Buffer pool management and the [`PageStore`] contract
//! - [`storage`] - Disk I/O, page formats and record types
//! - [`index`] - The B+Tree
//!
//! # Quick Start
//! ```no_run
//! use pagetree::{BPlusTree, BufferPoolConfig, BufferPoolManager, MovieId, Rid, MOVIE_ID_INDEX};
//!
//! let bpm = BufferPoolManager::open(BufferPoolConfig::new(128, "movie_db"))?;
//! let index = BPlusTree::<_, MovieId, Rid>::new(&bpm, MOVIE_ID_INDEX)?;
//!
//! index.insert(MovieId::from("tt0000001"), Rid::new(0, 0))?;
//! index.insert(MovieId::from("tt0000002"), Rid::new(0, 1))?;
//!
//! let mut cursor = index.range_search(&MovieId::from("tt0000001"), &MovieId::from("tt0000002"))?;
//! while cursor.has_next()? {
//!     println!("{:?}", cursor.next_value()?);
//! }
//! bpm.flush_all_pages()?;
//! # Ok::<(), pagetree::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{BTreeConfig, BufferPoolConfig, MOVIE_ID_INDEX, PAGE_SIZE, TITLE_INDEX};
pub use common::{Error, FrameId, IndexSpace, PageId, PageKey, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, PageRef, PageStore, StatsSnapshot};
pub use index::btree::{BPlusTree, Cursor, FixedKey, MovieId};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskManager, Rid, TitleNameRecord};
