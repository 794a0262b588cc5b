//! Lazy iteration over the leaf chain.

use std::collections::VecDeque;

use tracing::trace;

use crate::buffer::PageStore;
use crate::common::{IndexSpace, PageId, Result};

use super::key::{IndexKey, IndexValue};
use super::node::{corrupted, IndexNode, LeafNode};
use super::pin::PinnedPage;

/// Values whose keys fall in `[start, end]`, in key order.
///
/// A cursor buffers the matching values of one leaf at a time and holds no
/// pin between calls. The next leaf is pinned, decoded and released the first
/// time the buffer runs dry. After an error the cursor is exhausted.
///
/// # Example
/// ```ignore
/// let mut cursor = tree.range_search(&start, &end)?;
/// while cursor.has_next()? {
///     let rid = cursor.next_value()?;
/// }
/// ```
pub struct Cursor<'s, S: PageStore + ?Sized, K, V> {
    store: &'s S,
    space: IndexSpace,
    start: K,
    end: K,
    buffered: VecDeque<V>,
    next_leaf: Option<PageId>,
    last_key: Option<K>,
}

impl<'s, S, K, V> Cursor<'s, S, K, V>
where
    S: PageStore + ?Sized,
    K: IndexKey,
    V: IndexValue,
{
    /// A cursor that yields nothing.
    pub(crate) fn empty(store: &'s S, space: IndexSpace, start: K, end: K) -> Self {
        Self {
            store,
            space,
            start,
            end,
            buffered: VecDeque::new(),
            next_leaf: None,
            last_key: None,
        }
    }

    /// A cursor positioned on `leaf`, the leftmost leaf that may hold `start`.
    pub(crate) fn open(
        store: &'s S,
        space: IndexSpace,
        start: K,
        end: K,
        leaf: &PinnedPage<'s, S>,
        node: LeafNode<K, V>,
    ) -> Result<Self> {
        let mut cursor = Self::empty(store, space, start, end);
        cursor.absorb(leaf, node)?;
        Ok(cursor)
    }

    /// Whether another value is available, loading the next leaf if needed.
    pub fn has_next(&mut self) -> Result<bool> {
        while self.buffered.is_empty() {
            let Some(leaf_id) = self.next_leaf.take() else {
                return Ok(false);
            };
            let page = PinnedPage::fetch(self.store, leaf_id, self.space)?;
            match page.read_node::<K, V>()? {
                IndexNode::Leaf(node) => self.absorb(&page, node)?,
                IndexNode::Internal(_) => {
                    return Err(corrupted(page.key(), "leaf chain links to an internal node"));
                }
            }
        }
        Ok(true)
    }

    /// The next value, or `None` once the range is exhausted.
    pub fn next_value(&mut self) -> Result<Option<V>> {
        if self.has_next()? {
            Ok(self.buffered.pop_front())
        } else {
            Ok(None)
        }
    }

    fn absorb(&mut self, page: &PinnedPage<'s, S>, node: LeafNode<K, V>) -> Result<()> {
        let LeafNode { keys, values, next } = node;

        if let (Some(first), Some(last)) = (keys.first(), &self.last_key) {
            if first < last {
                return Err(corrupted(page.key(), "leaf chain goes backwards"));
            }
        }
        trace!(leaf = %page.key(), entries = keys.len(), "scanning leaf");

        self.next_leaf = next;
        for (key, value) in keys.into_iter().zip(values) {
            if key > self.end {
                self.next_leaf = None;
                break;
            }
            if key >= self.start {
                self.buffered.push_back(value);
            }
            self.last_key = Some(key);
        }
        Ok(())
    }
}

impl<S, K, V> Iterator for Cursor<'_, S, K, V>
where
    S: PageStore + ?Sized,
    K: IndexKey,
    V: IndexValue,
{
    type Item = Result<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}
