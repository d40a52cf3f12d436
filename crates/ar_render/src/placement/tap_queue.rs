//! Cross-thread tap hand-off
//!
//! Input threads [`offer`](TapQueue::offer) taps; the render thread
//! [`poll`](TapQueue::poll)s at most one per tick. The queue is bounded and
//! drops new taps when full, so a burst of input never backs up rendering.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::tracking::Tap;

/// Default number of queued taps
pub const TAP_QUEUE_CAPACITY: usize = 16;

/// Bounded multi-producer tap queue; clones share the same queue
#[derive(Debug, Clone)]
pub struct TapQueue {
    inner: Arc<Mutex<VecDeque<Tap>>>,
    capacity: usize,
}

impl Default for TapQueue {
    fn default() -> Self {
        Self::new(TAP_QUEUE_CAPACITY)
    }
}

impl TapQueue {
    /// Create a queue holding at most `capacity` taps
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Enqueue a tap; returns `false` if it was dropped
    pub fn offer(&self, tap: Tap) -> bool {
        match self.inner.lock() {
            Ok(mut queue) if queue.len() < self.capacity => {
                queue.push_back(tap);
                true
            }
            Ok(_) => {
                log::debug!("Tap queue full; dropping tap at ({}, {})", tap.x, tap.y);
                false
            }
            Err(_) => false,
        }
    }

    /// Dequeue the oldest tap
    pub fn poll(&self) -> Option<Tap> {
        self.inner.lock().ok().and_then(|mut queue| queue.pop_front())
    }

    /// Number of queued taps
    pub fn len(&self) -> usize {
        self.inner.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Whether no taps are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taps_come_out_in_order_one_at_a_time() {
        let queue = TapQueue::default();
        queue.offer(Tap { x: 1.0, y: 1.0 });
        queue.offer(Tap { x: 2.0, y: 2.0 });
        assert_eq!(queue.poll(), Some(Tap { x: 1.0, y: 1.0 }));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.poll(), Some(Tap { x: 2.0, y: 2.0 }));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn full_queue_drops_new_taps() {
        let queue = TapQueue::new(2);
        assert!(queue.offer(Tap { x: 0.0, y: 0.0 }));
        assert!(queue.offer(Tap { x: 1.0, y: 0.0 }));
        assert!(!queue.offer(Tap { x: 2.0, y: 0.0 }));
        assert_eq!(queue.poll().map(|t| t.x), Some(0.0));
    }

    #[test]
    fn producers_on_other_threads_share_the_queue() {
        let queue = TapQueue::new(64);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let producer = queue.clone();
                std::thread::spawn(move || {
                    for j in 0..8 {
                        producer.offer(Tap { x: i as f32, y: j as f32 });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 32);
    }
}
