//! Disk-resident B+Tree over a [`PageStore`](crate::buffer::PageStore).
//!
//! - [`BPlusTree`] - Insert with node splits, point and range search
//! - [`Cursor`] - Lazy, leaf-at-a-time result iteration
//! - [`node`] - In-memory node forms and their page encoding
//! - [`FixedKey`] / [`MovieId`] - Fixed-width string keys

mod cursor;
mod key;
pub mod node;
mod pin;
mod tree;

pub use cursor::Cursor;
pub use key::{FixedKey, IndexKey, IndexValue, MovieId};
pub use node::{IndexNode, InternalNode, LeafNode};
pub use tree::{BPlusTree, TreeShape};
