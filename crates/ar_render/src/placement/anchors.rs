//! Placed anchors with a fixed capacity

use crate::tracking::{Anchor, AnchorId, Frame, TrackingState};

/// Maximum number of placed objects
pub const MAX_ANCHORS: usize = 20;

/// Anchors created by taps, oldest first
///
/// When full, the oldest anchor is detached and removed before a new one is
/// appended, so the store never exceeds its capacity.
#[derive(Debug, Clone)]
pub struct AnchorStore {
    anchors: Vec<Anchor>,
    capacity: usize,
}

impl Default for AnchorStore {
    fn default() -> Self {
        Self { anchors: Vec::with_capacity(MAX_ANCHORS), capacity: MAX_ANCHORS }
    }
}

impl AnchorStore {
    #[cfg(test)]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { anchors: Vec::with_capacity(capacity), capacity }
    }

    /// Capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of anchors
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether no anchors are placed
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    /// Ids, oldest first
    pub fn ids(&self) -> Vec<AnchorId> {
        self.anchors.iter().map(|a| a.id).collect()
    }

    /// If full, detach and remove the oldest anchor
    pub fn evict_if_full(&mut self, detach: impl FnOnce(AnchorId)) -> Option<AnchorId> {
        if self.anchors.len() < self.capacity {
            return None;
        }
        let oldest = self.anchors[0].id;
        detach(oldest);
        self.anchors.remove(0);
        log::debug!("Anchor limit {} reached; evicted {:?}", self.capacity, oldest);
        Some(oldest)
    }

    /// Append a new anchor, evicting the oldest first when full
    pub fn push(&mut self, anchor: Anchor, detach: impl FnOnce(AnchorId)) -> Option<AnchorId> {
        let evicted = self.evict_if_full(detach);
        self.anchors.push(anchor);
        evicted
    }

    /// Refresh poses and tracking states from the session's latest frame
    ///
    /// Anchors the session no longer reports are marked stopped.
    pub fn sync(&mut self, frame: &Frame) {
        for anchor in &mut self.anchors {
            match frame.anchors.iter().find(|a| a.id == anchor.id) {
                Some(current) => {
                    anchor.pose = current.pose;
                    anchor.tracking_state = current.tracking_state;
                }
                None => anchor.tracking_state = TrackingState::Stopped,
            }
        }
    }

    /// Forget every anchor, e.g. after the session was replaced
    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Pose;

    fn anchor(id: u64) -> Anchor {
        Anchor { id: AnchorId(id), pose: Pose::IDENTITY, tracking_state: TrackingState::Tracking }
    }

    #[test]
    fn twenty_first_anchor_evicts_the_first() {
        let mut store = AnchorStore::default();
        let mut detached = Vec::new();
        for id in 1..=21 {
            store.push(anchor(id), |old| detached.push(old));
        }
        assert_eq!(store.len(), 20);
        assert_eq!(detached, vec![AnchorId(1)]);
        assert_eq!(store.ids().first(), Some(&AnchorId(2)));
        assert_eq!(store.ids().last(), Some(&AnchorId(21)));
    }

    #[test]
    fn store_never_exceeds_capacity() {
        let mut store = AnchorStore::with_capacity(3);
        let mut detached = Vec::new();
        for id in 1..=10 {
            store.push(anchor(id), |old| detached.push(old.0));
            assert!(store.len() <= 3);
        }
        assert_eq!(detached, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(store.ids(), vec![AnchorId(8), AnchorId(9), AnchorId(10)]);
    }

    #[test]
    fn sync_follows_the_frame() {
        let mut store = AnchorStore::default();
        store.push(anchor(1), |_| {});
        let mut moved = anchor(1);
        moved.pose = Pose::from_translation(1.0, 2.0, 3.0);
        moved.tracking_state = TrackingState::Paused;
        let frame = Frame { anchors: vec![moved.clone()], ..Default::default() };
        store.sync(&frame);
        assert_eq!(store.iter().next(), Some(&moved));
    }

    #[test]
    fn anchors_missing_from_the_frame_stop() {
        let mut store = AnchorStore::default();
        store.push(anchor(1), |_| {});
        store.push(anchor(2), |_| {});
        let frame = Frame { anchors: vec![anchor(2)], ..Default::default() };
        store.sync(&frame);

        let states: Vec<_> = store.iter().map(|a| a.tracking_state).collect();
        assert_eq!(states, vec![TrackingState::Stopped, TrackingState::Tracking]);
    }
}
