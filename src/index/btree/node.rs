//! In-memory B+Tree nodes and their page encoding.
//!
//! # Page layout
//! ```text
//! Offset  Size              Field
//! ------  ----              -----
//! 0       13                PageHeader (type = BTreeLeaf | BTreeInternal)
//! 13      2                 key count n (u16, little-endian)
//! 15      4                 next leaf PageId (leaf only, INVALID otherwise)
//! 19      n * K::WIDTH      keys
//! ...     n * V::WIDTH      values (leaf)
//!         (n+1) * 4         child PageIds (internal)
//! ```
//!
//! The node kind is taken from the header's page type. Every encode rewrites
//! the checksum and every decode verifies it.

use crate::common::config::{PAGE_ID_SIZE, PAGE_SIZE};
use crate::common::{Error, FixedWidth, PageId, PageKey, Result};
use crate::storage::page::{Page, PageHeader, PageType};

const OFFSET_KEY_COUNT: usize = PageHeader::SIZE;
const OFFSET_NEXT_LEAF: usize = OFFSET_KEY_COUNT + 2;

/// Bytes in front of the first key slot.
pub const NODE_HEADER_SIZE: usize = OFFSET_NEXT_LEAF + PAGE_ID_SIZE;

const SLOT_AREA: usize = PAGE_SIZE - NODE_HEADER_SIZE;

/// Most (key, value) pairs a leaf page can physically hold.
pub fn max_leaf_entries<K: FixedWidth, V: FixedWidth>() -> usize {
    (SLOT_AREA / (K::WIDTH + V::WIDTH)).min(u16::MAX as usize)
}

/// Most children an internal page can physically hold.
pub fn max_internal_children<K: FixedWidth>() -> usize {
    ((SLOT_AREA - PAGE_ID_SIZE) / (K::WIDTH + PAGE_ID_SIZE) + 1).min(u16::MAX as usize)
}

/// Leaf node: sorted keys with their values, chained to the next leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode<K, V> {
    pub keys: Vec<K>,
    pub values: Vec<V>,
    pub next: Option<PageId>,
}

impl<K: Ord, V> LeafNode<K, V> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert after any entries with an equal key.
    pub fn insert(&mut self, key: K, value: V) {
        let pos = self.keys.partition_point(|k| k <= &key);
        self.keys.insert(pos, key);
        self.values.insert(pos, value);
    }

    /// Move the upper half into a new node. The left keeps the smaller half.
    ///
    /// The caller relinks `next` pointers once the right node has a page.
    pub fn split_off(&mut self) -> Self {
        let mid = self.keys.len() / 2;
        Self {
            keys: self.keys.split_off(mid),
            values: self.values.split_off(mid),
            next: None,
        }
    }
}

impl<K: Ord, V> Default for LeafNode<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal node: `keys.len() + 1` children separated by `keys`.
///
/// Child `i` holds keys in `[keys[i-1], keys[i]]`. Equal keys may sit on
/// both sides of a separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode<K> {
    pub keys: Vec<K>,
    pub children: Vec<PageId>,
}

impl<K: Ord> InternalNode<K> {
    /// Root created when the old root splits.
    pub fn new_root(left: PageId, separator: K, right: PageId) -> Self {
        Self {
            keys: vec![separator],
            children: vec![left, right],
        }
    }

    /// Child to descend into when inserting `key`. Ties go right.
    pub fn insert_slot(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Leftmost child that can hold `key`.
    pub fn search_slot(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// Record that the child at `slot` split, with `right` now following it.
    pub fn insert_child(&mut self, slot: usize, separator: K, right: PageId) {
        self.keys.insert(slot, separator);
        self.children.insert(slot + 1, right);
    }

    /// Split an overfull node. Returns the separator that moves up and the
    /// new right sibling; the middle key lives in neither half afterwards.
    ///
    /// # Panics
    /// Panics if the node has fewer than two keys.
    pub fn split(&mut self) -> (K, Self) {
        let mid = self.keys.len() / 2;
        let separator = self.keys.remove(mid);
        let right_keys = self.keys.split_off(mid);
        let right_children = self.children.split_off(mid + 1);
        (
            separator,
            Self {
                keys: right_keys,
                children: right_children,
            },
        )
    }
}

/// A decoded index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexNode<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternalNode<K>),
}

impl<K: FixedWidth + Ord, V: FixedWidth> IndexNode<K, V> {
    pub fn key_count(&self) -> usize {
        match self {
            IndexNode::Leaf(leaf) => leaf.keys.len(),
            IndexNode::Internal(node) => node.keys.len(),
        }
    }

    /// Serialize into `page`, replacing its previous content.
    ///
    /// # Errors
    /// `CapacityExceeded` if the node does not fit the page layout,
    /// `Corrupted` if its vectors disagree in length.
    pub fn encode(&self, page: &mut Page, at: PageKey) -> Result<()> {
        let (page_type, next) = match self {
            IndexNode::Leaf(leaf) => {
                check_fits(at, leaf.keys.len(), max_leaf_entries::<K, V>())?;
                if leaf.values.len() != leaf.keys.len() {
                    return Err(corrupted(at, "leaf keys and values differ in length"));
                }
                (PageType::BTreeLeaf, leaf.next.unwrap_or(PageId::INVALID))
            }
            IndexNode::Internal(node) => {
                check_fits(at, node.children.len(), max_internal_children::<K>())?;
                if node.children.len() != node.keys.len() + 1 {
                    return Err(corrupted(at, "internal node needs one more child than keys"));
                }
                (PageType::BTreeInternal, PageId::INVALID)
            }
        };

        page.reset();
        page.set_header(&PageHeader::new(page_type));
        let data = page.as_mut_slice();
        (self.key_count() as u16).write_to(&mut data[OFFSET_KEY_COUNT..]);
        next.write_to(&mut data[OFFSET_NEXT_LEAF..]);

        let mut offset = NODE_HEADER_SIZE;
        match self {
            IndexNode::Leaf(leaf) => {
                offset = write_slots(data, offset, &leaf.keys);
                write_slots(data, offset, &leaf.values);
            }
            IndexNode::Internal(node) => {
                offset = write_slots(data, offset, &node.keys);
                write_slots(data, offset, &node.children);
            }
        }

        page.update_checksum();
        Ok(())
    }

    /// Parse `page`, rejecting anything that is not a well-formed node.
    pub fn decode(page: &Page, at: PageKey) -> Result<Self> {
        if !page.verify_checksum() {
            return Err(corrupted(at, "checksum mismatch"));
        }

        let data = page.as_slice();
        let count = u16::read_from(&data[OFFSET_KEY_COUNT..]) as usize;
        let next = PageId::read_from(&data[OFFSET_NEXT_LEAF..]);

        let node = match page.header().page_type {
            PageType::BTreeLeaf => {
                if count > max_leaf_entries::<K, V>() {
                    return Err(corrupted(at, format!("leaf key count {} out of range", count)));
                }
                let (keys, offset) = read_slots::<K>(data, NODE_HEADER_SIZE, count);
                let (values, _) = read_slots::<V>(data, offset, count);
                IndexNode::Leaf(LeafNode {
                    keys,
                    values,
                    next: next.into_option(),
                })
            }
            PageType::BTreeInternal => {
                if count == 0 || count + 1 > max_internal_children::<K>() {
                    return Err(corrupted(
                        at,
                        format!("internal key count {} out of range", count),
                    ));
                }
                let (keys, offset) = read_slots::<K>(data, NODE_HEADER_SIZE, count);
                let (children, _) = read_slots::<PageId>(data, offset, count + 1);
                if children.iter().any(|child| !child.is_valid()) {
                    return Err(corrupted(at, "internal node has an invalid child pointer"));
                }
                IndexNode::Internal(InternalNode { keys, children })
            }
            other => {
                return Err(corrupted(at, format!("not an index node: {:?}", other)));
            }
        };

        let keys = match &node {
            IndexNode::Leaf(leaf) => &leaf.keys,
            IndexNode::Internal(internal) => &internal.keys,
        };
        if keys.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(corrupted(at, "keys out of order"));
        }

        Ok(node)
    }
}

fn check_fits(at: PageKey, len: usize, capacity: usize) -> Result<()> {
    if len > capacity {
        return Err(Error::CapacityExceeded {
            page_id: at.page_id,
            space: at.space,
            len,
            capacity,
        });
    }
    Ok(())
}

pub(crate) fn corrupted(at: PageKey, reason: impl Into<String>) -> Error {
    Error::Corrupted {
        page_id: at.page_id,
        space: at.space,
        reason: reason.into(),
    }
}

fn write_slots<T: FixedWidth>(data: &mut [u8], mut offset: usize, items: &[T]) -> usize {
    for item in items {
        item.write_to(&mut data[offset..offset + T::WIDTH]);
        offset += T::WIDTH;
    }
    offset
}

fn read_slots<T: FixedWidth>(data: &[u8], mut offset: usize, count: usize) -> (Vec<T>, usize) {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(T::read_from(&data[offset..offset + T::WIDTH]));
        offset += T::WIDTH;
    }
    (items, offset)
}
