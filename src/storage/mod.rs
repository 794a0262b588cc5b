//! Storage layer - disk I/O, page formats and stored record types.
//!
//! - [`DiskManager`] - File I/O for one index space
//! - [`page`] - Page types and layouts
//! - [`Rid`] / [`TitleNameRecord`] - Record locator and fixed-width record

mod disk_manager;
pub mod page;
mod record;

pub use disk_manager::DiskManager;
pub use record::{Rid, TitleNameRecord};
