//! Optional audio producer: pushes tempo estimates from a separate thread
//! (or async task) into a small bounded queue the engine drains at the
//! start of each tick. Never calls into the engine directly (spec §5).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A tempo estimate pushed by an external detector. The engine does not
/// prescribe how this is computed (spec §9, Open Questions) — only how it
/// is adopted (see `rhythm::RhythmClock::consider_tempo_estimate`).
#[derive(Debug, Clone, Copy)]
pub struct TempoEstimate {
    pub bpm: f32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

struct Inner {
    queue: Mutex<VecDeque<TempoEstimate>>,
    capacity: usize,
}

/// Consumer handle, owned by the engine. Drains estimates pushed by any
/// cloned `AudioTapProducer`.
#[derive(Clone)]
pub struct AudioTap {
    inner: Arc<Inner>,
}

/// Producer handle, cloneable and `Send + Sync`, intended to be handed to
/// an audio callback thread or async task.
#[derive(Clone)]
pub struct AudioTapProducer {
    inner: Arc<Inner>,
}

impl AudioTap {
    /// Create a tap with its matching producer handle.
    pub fn new(capacity: usize) -> (Self, AudioTapProducer) {
        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        });
        (
            Self {
                inner: inner.clone(),
            },
            AudioTapProducer { inner },
        )
    }

    /// Drain all pending estimates in push order, oldest first.
    pub fn drain(&self) -> Vec<TempoEstimate> {
        let mut q = self.inner.queue.lock().expect("audio tap queue poisoned");
        q.drain(..).collect()
    }
}

impl AudioTapProducer {
    /// Push a new estimate. If the queue is at capacity, the oldest pending
    /// estimate is dropped to make room — staleness matters more than
    /// completeness for a continuously-updated tempo estimate.
    pub fn push(&self, estimate: TempoEstimate) {
        let mut q = self.inner.queue.lock().expect("audio tap queue poisoned");
        if q.len() >= self.inner.capacity {
            q.pop_front();
        }
        q.push_back(estimate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_push_order() {
        let (tap, producer) = AudioTap::new(8);
        producer.push(TempoEstimate { bpm: 100.0, confidence: 0.5 });
        producer.push(TempoEstimate { bpm: 110.0, confidence: 0.6 });
        let drained = tap.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].bpm, 100.0);
        assert_eq!(drained[1].bpm, 110.0);
    }

    #[test]
    fn overflow_drops_oldest() {
        let (tap, producer) = AudioTap::new(2);
        producer.push(TempoEstimate { bpm: 1.0, confidence: 0.1 });
        producer.push(TempoEstimate { bpm: 2.0, confidence: 0.1 });
        producer.push(TempoEstimate { bpm: 3.0, confidence: 0.1 });
        let drained = tap.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].bpm, 2.0);
        assert_eq!(drained[1].bpm, 3.0);
    }

    #[test]
    fn drain_empties_queue() {
        let (tap, producer) = AudioTap::new(4);
        producer.push(TempoEstimate { bpm: 90.0, confidence: 0.9 });
        assert_eq!(tap.drain().len(), 1);
        assert!(tap.drain().is_empty());
    }
}
