//! LRU (Least Recently Used) replacement policy.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::common::FrameId;

/// Evicts the evictable frame whose last access is oldest.
///
/// Every access stamps the frame with a monotonically increasing tick;
/// `by_tick` orders frames by their latest stamp.
pub struct LruReplacer {
    tick: u64,
    last_access: HashMap<FrameId, u64>,
    by_tick: BTreeMap<u64, FrameId>,
    evictable: HashSet<FrameId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self {
            tick: 0,
            last_access: HashMap::new(),
            by_tick: BTreeMap::new(),
            evictable: HashSet::new(),
        }
    }

    /// Record that a frame was accessed, making it most recently used.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.tick += 1;
        if let Some(old) = self.last_access.insert(frame_id, self.tick) {
            self.by_tick.remove(&old);
        }
        self.by_tick.insert(self.tick, frame_id);
    }

    /// Mark a frame as evictable (pin count dropped to 0) or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Select and forget the least recently used evictable frame.
    pub fn evict(&mut self) -> Option<FrameId> {
        let (tick, frame_id) = self
            .by_tick
            .iter()
            .find(|(_, frame_id)| self.evictable.contains(frame_id))
            .map(|(&tick, &frame_id)| (tick, frame_id))?;

        self.by_tick.remove(&tick);
        self.last_access.remove(&frame_id);
        self.evictable.remove(&frame_id);
        Some(frame_id)
    }

    /// Forget a frame entirely (its page was deleted from the pool).
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(tick) = self.last_access.remove(&frame_id) {
            self.by_tick.remove(&tick);
        }
        self.evictable.remove(&frame_id);
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_evictable(replacer: &mut LruReplacer, ids: &[usize]) {
        for &id in ids {
            replacer.set_evictable(FrameId::new(id), true);
        }
    }

    #[test]
    fn test_lru_evicts_oldest_access() {
        let mut replacer = LruReplacer::new();
        for id in 0..3 {
            replacer.record_access(FrameId::new(id));
        }
        replacer.record_access(FrameId::new(0));
        all_evictable(&mut replacer, &[0, 1, 2]);

        assert_eq!(replacer.size(), 3);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_skips_pinned() {
        let mut replacer = LruReplacer::new();
        for id in 0..3 {
            replacer.record_access(FrameId::new(id));
        }
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_remove() {
        let mut replacer = LruReplacer::new();
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        all_evictable(&mut replacer, &[0, 1]);

        replacer.remove(FrameId::new(0));

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }
}
