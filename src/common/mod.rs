//! Common types and utilities shared across pagetree.
//!
//! - Configuration constants and runtime settings
//! - Error types
//! - Identifiers (PageId, FrameId, IndexSpace)
//! - Fixed-width encoding used by page layouts

pub mod config;
pub mod error;
mod fixed_width;
mod frame_id;
mod index_space;
mod page_id;

pub use error::{Error, Result};
pub use fixed_width::{trim_padding, truncate_or_pad, FixedWidth};
pub use frame_id::FrameId;
pub use index_space::{IndexSpace, PageKey};
pub use page_id::PageId;
