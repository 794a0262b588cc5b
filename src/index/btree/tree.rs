//! The B+Tree engine: insert with splits, point and range search.

use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::buffer::PageStore;
use crate::common::config::BTreeConfig;
use crate::common::{Error, IndexSpace, PageId, Result};

use super::cursor::Cursor;
use super::key::{IndexKey, IndexValue};
use super::node::{corrupted, IndexNode, InternalNode, LeafNode};
use super::pin::PinnedPage;

/// A disk-resident B+Tree mapping fixed-width keys to fixed-width values.
///
/// The tree owns no pages: every node lives in `store` under `space`, and the
/// root pointer is read from the store at the start of each operation.
/// Duplicate keys are allowed and kept in insertion order.
///
/// The tree performs no locking of its own. Callers sharing one index space
/// between threads must serialize mutating calls.
///
/// # Example
/// ```no_run
/// use pagetree::{BPlusTree, BufferPoolConfig, BufferPoolManager, MovieId, Rid, MOVIE_ID_INDEX};
///
/// let bpm = BufferPoolManager::open(BufferPoolConfig::new(64, "data"))?;
/// let tree = BPlusTree::<_, MovieId, Rid>::new(&bpm, MOVIE_ID_INDEX)?;
/// tree.insert(MovieId::from("tt0000001"), Rid::new(0, 0))?;
///
/// let found: Vec<Rid> = tree.search(&MovieId::from("tt0000001"))?.collect::<Result<_, _>>()?;
/// assert_eq!(found, vec![Rid::new(0, 0)]);
/// # Ok::<(), pagetree::Error>(())
/// ```
pub struct BPlusTree<'s, S: PageStore + ?Sized, K, V> {
    store: &'s S,
    space: IndexSpace,
    config: BTreeConfig,
    _marker: PhantomData<fn() -> (K, V)>,
}

/// A pinned internal node on the insert path, with the slot taken from it.
struct PathEntry<'s, S: PageStore + ?Sized, K> {
    page: PinnedPage<'s, S>,
    node: InternalNode<K>,
    slot: usize,
}

/// A completed split waiting to be recorded in the parent.
struct Split<K> {
    left: PageId,
    separator: K,
    right: PageId,
}

/// Shape of a tree as measured by [`BPlusTree::check_invariants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeShape {
    /// Levels from root to leaf, 0 for an empty tree.
    pub height: usize,
    pub internal_nodes: usize,
    pub leaf_nodes: usize,
    pub entries: usize,
}

impl<'s, S, K, V> BPlusTree<'s, S, K, V>
where
    S: PageStore + ?Sized,
    K: IndexKey,
    V: IndexValue,
{
    /// Tree over `space` with nodes sized to fill a page.
    pub fn new(store: &'s S, space: IndexSpace) -> Result<Self> {
        Self::with_config(store, space, BTreeConfig::for_types::<K, V>())
    }

    /// Tree over `space` with explicit node capacities.
    ///
    /// # Errors
    /// `InvalidArgument` if the capacities are below the minimum or do not fit
    /// a page.
    pub fn with_config(store: &'s S, space: IndexSpace, config: BTreeConfig) -> Result<Self> {
        config.validate::<K, V>()?;
        Ok(Self {
            store,
            space,
            config,
            _marker: PhantomData,
        })
    }

    pub fn space(&self) -> IndexSpace {
        self.space
    }

    pub fn config(&self) -> BTreeConfig {
        self.config
    }

    /// Insert `(key, value)`. Equal keys are kept, the newest after the rest.
    ///
    /// The descent releases every ancestor above the deepest node that cannot
    /// split, so at most the splitting part of the path stays pinned.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let root_id = match self.store.get_root_page_id(self.space)? {
            Some(root_id) => root_id,
            None => self.bootstrap_root()?,
        };

        let mut path: Vec<PathEntry<'s, S, K>> = Vec::new();
        let mut current = PinnedPage::fetch(self.store, root_id, self.space)?;
        let mut leaf = loop {
            match current.read_node::<K, V>()? {
                IndexNode::Internal(node) => {
                    let slot = node.insert_slot(&key);
                    let child_id = node.children[slot];
                    if node.children.len() < self.config.internal_max_children {
                        path.clear();
                    }
                    trace!(page = %current.key(), slot, "descending for insert");
                    path.push(PathEntry {
                        page: current,
                        node,
                        slot,
                    });
                    current = PinnedPage::fetch(self.store, child_id, self.space)?;
                }
                IndexNode::Leaf(leaf) => break leaf,
            }
        };

        if leaf.len() < self.config.leaf_max_entries {
            path.clear();
        }
        leaf.insert(key, value);
        if leaf.len() <= self.config.leaf_max_entries {
            return current.write_node(&IndexNode::Leaf(leaf));
        }
        self.check_overflow(&current, leaf.len(), self.config.leaf_max_entries)?;

        // Full ancestors sit at the bottom of the path. The first one with
        // room absorbs the split; if none has room the root splits too.
        let splitting = path
            .iter()
            .rev()
            .take_while(|entry| entry.node.children.len() >= self.config.internal_max_children)
            .count();
        for entry in path.iter().rev().take(splitting) {
            self.check_overflow(
                &entry.page,
                entry.node.children.len() + 1,
                self.config.internal_max_children,
            )?;
        }
        let grows_root = splitting == path.len();
        if grows_root {
            let top = path.first().map_or(current.page_id(), |entry| entry.page.page_id());
            if top != root_id {
                return Err(Error::Corrupted {
                    page_id: top,
                    space: self.space,
                    reason: "split reached the top of the insert path below the root".into(),
                });
            }
        }

        // Every page the split needs is allocated before the first write, so a
        // failed allocation leaves the tree untouched.
        let right_page = PinnedPage::create(self.store, self.space)?;
        let siblings = (0..splitting)
            .map(|_| PinnedPage::create(self.store, self.space))
            .collect::<Result<Vec<_>>>()?;
        let root_page = if grows_root {
            Some(PinnedPage::create(self.store, self.space)?)
        } else {
            None
        };

        let mut right = leaf.split_off();
        right.next = leaf.next;
        leaf.next = Some(right_page.page_id());
        let separator = right.keys[0].clone();
        debug!(
            left = %current.key(),
            right = %right_page.key(),
            left_len = leaf.len(),
            right_len = right.len(),
            "split leaf"
        );
        right_page.write_node(&IndexNode::Leaf(right))?;
        current.write_node(&IndexNode::Leaf(leaf))?;

        let mut split = Split {
            left: current.page_id(),
            separator,
            right: right_page.page_id(),
        };
        drop(right_page);
        drop(current);

        let mut siblings = siblings.into_iter();
        while let Some(PathEntry {
            page,
            mut node,
            slot,
        }) = path.pop()
        {
            node.insert_child(slot, split.separator, split.right);
            let Some(right_page) = siblings.next() else {
                return page.write_node(&IndexNode::<K, V>::Internal(node));
            };

            let (separator, right) = node.split();
            debug!(
                left = %page.key(),
                right = %right_page.key(),
                separator = ?separator,
                "split internal node"
            );
            right_page.write_node(&IndexNode::<K, V>::Internal(right))?;
            page.write_node(&IndexNode::<K, V>::Internal(node))?;
            split = Split {
                left: page.page_id(),
                separator,
                right: right_page.page_id(),
            };
        }

        match root_page {
            Some(page) => self.grow_root(page, split),
            None => Ok(()),
        }
    }

    /// Values stored under `key`, in insertion order.
    pub fn search(&self, key: &K) -> Result<Cursor<'s, S, K, V>> {
        self.scan(key, key)
    }

    /// Values whose keys lie in `[start, end]`, in key order.
    ///
    /// # Errors
    /// `InvalidRange` if `start > end`.
    pub fn range_search(&self, start: &K, end: &K) -> Result<Cursor<'s, S, K, V>> {
        if start > end {
            return Err(Error::InvalidRange {
                start: format!("{:?}", start),
                end: format!("{:?}", end),
            });
        }
        self.scan(start, end)
    }

    /// Number of levels from root to leaf, 0 when the tree has no root.
    pub fn height(&self) -> Result<usize> {
        let Some(mut page_id) = self.store.get_root_page_id(self.space)? else {
            return Ok(0);
        };
        let mut height = 1;
        loop {
            let page = PinnedPage::fetch(self.store, page_id, self.space)?;
            match page.read_node::<K, V>()? {
                IndexNode::Internal(node) => {
                    page_id = node.children[0];
                    height += 1;
                }
                IndexNode::Leaf(_) => return Ok(height),
            }
        }
    }

    /// Walk the whole tree and verify its structure.
    ///
    /// Checks node capacities, separator bounds, uniform leaf depth and that
    /// the leaf chain visits every leaf once in key order. At most one page
    /// is pinned at a time.
    ///
    /// # Errors
    /// `Corrupted` naming the first offending page.
    pub fn check_invariants(&self) -> Result<TreeShape> {
        let Some(root_id) = self.store.get_root_page_id(self.space)? else {
            return Ok(TreeShape::default());
        };

        let mut walk = Walk {
            shape: TreeShape::default(),
            leaves: Vec::new(),
        };
        self.check_subtree(root_id, None, None, 1, &mut walk)?;

        for pair in walk.leaves.windows(2) {
            let (page_id, next) = pair[0];
            if next != Some(pair[1].0) {
                return Err(Error::Corrupted {
                    page_id,
                    space: self.space,
                    reason: format!("leaf links to {:?}, expected {}", next, pair[1].0),
                });
            }
        }
        if let Some(&(page_id, Some(next))) = walk.leaves.last() {
            return Err(Error::Corrupted {
                page_id,
                space: self.space,
                reason: format!("last leaf links to {}", next),
            });
        }
        Ok(walk.shape)
    }

    fn check_subtree(
        &self,
        page_id: PageId,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        let (node, at) = {
            let page = PinnedPage::fetch(self.store, page_id, self.space)?;
            (page.read_node::<K, V>()?, page.key())
        };

        let keys = match &node {
            IndexNode::Leaf(leaf) => &leaf.keys,
            IndexNode::Internal(internal) => &internal.keys,
        };
        let below = lower.is_some_and(|lower| keys.first().is_some_and(|k| k < lower));
        let above = upper.is_some_and(|upper| keys.last().is_some_and(|k| k > upper));
        if below || above {
            return Err(corrupted(at, "key outside the parent's separator bounds"));
        }

        match node {
            IndexNode::Leaf(leaf) => {
                if leaf.len() > self.config.leaf_max_entries {
                    return Err(corrupted(at, "leaf over capacity"));
                }
                if leaf.is_empty() && depth > 1 {
                    return Err(corrupted(at, "empty non-root leaf"));
                }
                if walk.shape.height == 0 {
                    walk.shape.height = depth;
                } else if walk.shape.height != depth {
                    return Err(corrupted(at, "leaves at different depths"));
                }
                walk.shape.leaf_nodes += 1;
                walk.shape.entries += leaf.len();
                walk.leaves.push((page_id, leaf.next));
            }
            IndexNode::Internal(internal) => {
                if internal.children.len() > self.config.internal_max_children {
                    return Err(corrupted(at, "internal node over capacity"));
                }
                walk.shape.internal_nodes += 1;
                for (i, child) in internal.children.iter().enumerate() {
                    let child_lower = if i == 0 { lower } else { Some(&internal.keys[i - 1]) };
                    let child_upper = internal.keys.get(i).or(upper);
                    self.check_subtree(*child, child_lower, child_upper, depth + 1, walk)?;
                }
            }
        }
        Ok(())
    }

    fn scan(&self, start: &K, end: &K) -> Result<Cursor<'s, S, K, V>> {
        let Some(root_id) = self.store.get_root_page_id(self.space)? else {
            return Ok(Cursor::empty(self.store, self.space, start.clone(), end.clone()));
        };

        let mut page = PinnedPage::fetch(self.store, root_id, self.space)?;
        loop {
            match page.read_node::<K, V>()? {
                IndexNode::Internal(node) => {
                    let child_id = node.children[node.search_slot(start)];
                    page = PinnedPage::fetch(self.store, child_id, self.space)?;
                }
                IndexNode::Leaf(leaf) => {
                    return Cursor::open(
                        self.store,
                        self.space,
                        start.clone(),
                        end.clone(),
                        &page,
                        leaf,
                    );
                }
            }
        }
    }

    /// Create an empty leaf and publish it as the root.
    fn bootstrap_root(&self) -> Result<PageId> {
        let page = PinnedPage::create(self.store, self.space)?;
        page.write_node(&IndexNode::<K, V>::Leaf(LeafNode::new()))?;
        self.store.set_root_page_id(page.page_id(), self.space)?;
        debug!(root = %page.key(), "created root leaf");
        Ok(page.page_id())
    }

    /// Write a new root above `split` into `page` and publish it.
    fn grow_root(&self, page: PinnedPage<'s, S>, split: Split<K>) -> Result<()> {
        let root = InternalNode::new_root(split.left, split.separator, split.right);
        page.write_node(&IndexNode::<K, V>::Internal(root))?;
        self.store.set_root_page_id(page.page_id(), self.space)?;
        debug!(root = %page.key(), left = %split.left, right = %split.right, "tree grew a level");
        Ok(())
    }

    /// A node may overflow by exactly one entry before it splits.
    fn check_overflow(&self, page: &PinnedPage<'s, S>, len: usize, capacity: usize) -> Result<()> {
        if len > capacity + 1 {
            let at = page.key();
            return Err(Error::CapacityExceeded {
                page_id: at.page_id,
                space: at.space,
                len,
                capacity,
            });
        }
        Ok(())
    }
}

/// Accumulator for [`BPlusTree::check_invariants`].
struct Walk {
    shape: TreeShape,
    leaves: Vec<(PageId, Option<PageId>)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolManager;
    use crate::common::config::{BufferPoolConfig, MOVIE_ID_INDEX};
    use crate::index::btree::MovieId;
    use crate::storage::Rid;
    use tempfile::TempDir;

    fn pool(dir: &TempDir, frames: usize) -> BufferPoolManager {
        BufferPoolManager::open(BufferPoolConfig::new(frames, dir.path()).with_sync_writes(false))
            .unwrap()
    }

    fn collect<S: PageStore + ?Sized>(cursor: Cursor<'_, S, u32, u32>) -> Vec<u32> {
        cursor.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_empty_tree_has_no_root() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 8);
        let tree = BPlusTree::<_, MovieId, Rid>::new(&bpm, MOVIE_ID_INDEX).unwrap();

        assert_eq!(tree.height().unwrap(), 0);
        assert_eq!(tree.check_invariants().unwrap(), TreeShape::default());
        assert!(tree
            .search(&MovieId::from("tt9999999"))
            .unwrap()
            .next()
            .is_none());
        assert_eq!(bpm.get_root_page_id(MOVIE_ID_INDEX).unwrap(), None);
    }

    #[test]
    fn test_first_insert_creates_root_leaf() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 8);
        let tree = BPlusTree::<_, u32, u32>::new(&bpm, IndexSpace(3)).unwrap();

        tree.insert(7, 70).unwrap();
        assert_eq!(tree.height().unwrap(), 1);
        assert!(bpm.get_root_page_id(IndexSpace(3)).unwrap().is_some());
        assert_eq!(collect(tree.search(&7).unwrap()), vec![70]);
    }

    #[test]
    fn test_leaf_split_grows_tree() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 16);
        let config = BTreeConfig::with_capacities(3, 3);
        let tree = BPlusTree::<_, u32, u32>::with_config(&bpm, IndexSpace(1), config).unwrap();

        for k in 1..=4 {
            tree.insert(k, k * 10).unwrap();
        }
        let shape = tree.check_invariants().unwrap();
        assert_eq!(shape.height, 2);
        assert_eq!(shape.leaf_nodes, 2);
        assert_eq!(shape.entries, 4);
        for k in 1..=4 {
            assert_eq!(collect(tree.search(&k).unwrap()), vec![k * 10]);
        }
    }

    #[test]
    fn test_internal_split_grows_tree() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 32);
        let config = BTreeConfig::with_capacities(3, 3);
        let tree = BPlusTree::<_, u32, u32>::with_config(&bpm, IndexSpace(1), config).unwrap();

        for k in 0..40 {
            tree.insert(k, k).unwrap();
        }
        let shape = tree.check_invariants().unwrap();
        assert!(shape.height >= 3);
        assert_eq!(shape.entries, 40);
        assert_eq!(collect(tree.range_search(&0, &39).unwrap()), (0..40).collect::<Vec<_>>());
        assert_eq!(bpm.stats().snapshot().outstanding_pins(), 0);
    }

    #[test]
    fn test_duplicates_across_leaves() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 32);
        let config = BTreeConfig::with_capacities(3, 4);
        let tree = BPlusTree::<_, u32, u32>::with_config(&bpm, IndexSpace(1), config).unwrap();

        tree.insert(1, 0).unwrap();
        for v in 0..10 {
            tree.insert(5, v).unwrap();
        }
        tree.insert(9, 0).unwrap();

        tree.check_invariants().unwrap();
        assert_eq!(collect(tree.search(&5).unwrap()), (0..10).collect::<Vec<_>>());
        assert_eq!(collect(tree.range_search(&2, &8).unwrap()).len(), 10);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 8);
        let tree = BPlusTree::<_, u32, u32>::new(&bpm, IndexSpace(1)).unwrap();
        tree.insert(1, 1).unwrap();

        assert!(matches!(
            tree.range_search(&9, &1),
            Err(Error::InvalidRange { .. })
        ));
        assert_eq!(collect(tree.range_search(&1, &1).unwrap()), vec![1]);
    }

    #[test]
    fn test_invalid_capacity_is_rejected() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 8);
        let config = BTreeConfig::with_capacities(1, 3);
        assert!(BPlusTree::<_, u32, u32>::with_config(&bpm, IndexSpace(1), config).is_err());
    }

    #[test]
    fn test_cursor_reads_lazily() {
        let dir = TempDir::new().unwrap();
        let bpm = pool(&dir, 32);
        let config = BTreeConfig::with_capacities(4, 4);
        let tree = BPlusTree::<_, u32, u32>::with_config(&bpm, IndexSpace(1), config).unwrap();
        for k in 0..50 {
            tree.insert(k, k).unwrap();
        }

        let mut cursor = tree.range_search(&10, &40).unwrap();
        assert_eq!(bpm.stats().snapshot().outstanding_pins(), 0);
        assert_eq!(cursor.next_value().unwrap(), Some(10));
        assert!(cursor.has_next().unwrap());
        assert_eq!(cursor.by_ref().count(), 30);
        assert!(!cursor.has_next().unwrap());
        assert_eq!(cursor.next_value().unwrap(), None);
    }
}
