use std::collections::{HashMap, VecDeque};

use crate::common::types::FrameId;

/// Per-frame access record: the last K access timestamps plus evictability.
#[derive(Debug)]
struct LruKNode {
    history: VecDeque<u64>,
    evictable: bool,
}

impl LruKNode {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(k),
            evictable: false,
        }
    }

    /// Oldest timestamp in the K-window. For a frame with exactly K recorded
    /// accesses this is its K-th most recent access.
    fn front_timestamp(&self) -> u64 {
        *self
            .history
            .front()
            .expect("tracked frame has at least one recorded access")
    }
}

/// LRU-K replacement policy.
///
/// Frames with fewer than K recorded accesses have an infinite backward
/// K-distance and are evicted first, oldest first access winning. Among
/// frames with a full history the one whose K-th most recent access is
/// oldest is the victim.
///
/// Not internally synchronized; the buffer pool serializes access.
#[derive(Debug)]
pub struct LruKReplacer {
    node_store: HashMap<FrameId, LruKNode>,
    evictable_count: usize,
    current_timestamp: u64,
    k: usize,
}

impl LruKReplacer {
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "LRU-K requires k >= 1");
        Self {
            node_store: HashMap::new(),
            evictable_count: 0,
            current_timestamp: 0,
            k,
        }
    }

    /// Record an access to a frame, creating its node lazily. The history
    /// keeps at most K entries; the oldest is dropped.
    pub fn record_access(&mut self, frame_id: FrameId) {
        let k = self.k;
        let node = self
            .node_store
            .entry(frame_id)
            .or_insert_with(|| LruKNode::new(k));

        node.history.push_back(self.current_timestamp);
        if node.history.len() > k {
            node.history.pop_front();
        }
        self.current_timestamp += 1;
    }

    /// Toggle evictability of a tracked frame. Unknown frames are ignored.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if let Some(node) = self.node_store.get_mut(&frame_id) {
            if evictable && !node.evictable {
                self.evictable_count += 1;
            }
            if !evictable && node.evictable {
                self.evictable_count -= 1;
            }
            node.evictable = evictable;
        }
    }

    /// Drop a frame's record entirely. Removing a tracked frame that is not
    /// evictable is a caller bug.
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(node) = self.node_store.remove(&frame_id) {
            assert!(node.evictable, "cannot remove a pinned frame {}", frame_id);
            self.evictable_count -= 1;
        }
    }

    /// Select and remove a victim frame, or `None` if nothing is evictable.
    pub fn evict(&mut self) -> Option<FrameId> {
        // Frames with fewer than K accesses rank infinitely old; classic LRU
        // on the first access breaks the tie.
        let mut victim = self.min_by_front(|node| node.history.len() < self.k);
        if victim.is_none() {
            victim = self.min_by_front(|node| node.history.len() == self.k);
        }

        if let Some(frame_id) = victim {
            self.node_store.remove(&frame_id);
            self.evictable_count -= 1;
        }
        victim
    }

    /// Number of currently evictable frames.
    pub fn evictable_count(&self) -> usize {
        self.evictable_count
    }

    fn min_by_front(&self, filter: impl Fn(&LruKNode) -> bool) -> Option<FrameId> {
        self.node_store
            .iter()
            .filter(|(_, node)| node.evictable && filter(node))
            .min_by_key(|(_, node)| node.front_timestamp())
            .map(|(&frame_id, _)| frame_id)
    }
}
