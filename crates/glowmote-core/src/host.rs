//! Host-facing surface: the command queue the engine drains at the start
//! of every tick, and the event bus it publishes to afterward.
//!
//! Commands and events are both closed enums (spec §9 redesign: no dynamic
//! dictionaries at this boundary). Subscriber callbacks return `Result` so
//! a faulty subscriber is recorded on `diagnostics` and never unwinds
//! through the tick (spec §5).

use std::collections::VecDeque;

use crate::affect::{Emotion, Undertone};
use crate::body::Shape;
use crate::error::GestureRejectReason;
use crate::gesture::{GestureDescriptor, GestureId, PatternFamily};
use crate::rhythm::Subdivision;

/// Everything a host can ask the engine to do. Drained in FIFO order at
/// the start of `Engine::tick` (spec §5).
#[derive(Debug, Clone)]
pub enum Command {
    SetEmotion {
        emotion: Emotion,
        undertone: Option<Undertone>,
        fade_duration_s: Option<f32>,
    },
    SetShape {
        shape: Shape,
        morph_duration_s: Option<f32>,
    },
    TriggerGesture(GestureDescriptor),
    CancelGesture(GestureId),
    CancelGestureFamily(PatternFamily),
    SetBpm(f32),
    EnableRhythm,
    DisableRhythm,
    Pause,
    Resume,
    SeedRng(u64),
    Resize { width: u32, height: u32 },
}

/// Everything the engine can tell a host. Published synchronously from
/// inside `Engine::tick`, after the frame's state has settled.
#[derive(Debug, Clone)]
pub enum Event {
    EmotionChanged {
        emotion: Emotion,
        undertone: Option<Undertone>,
    },
    ShapeChanged {
        shape: Shape,
    },
    ShapeMorphed {
        shape: Shape,
    },
    GestureStarted {
        id: GestureId,
        family: PatternFamily,
    },
    GestureEnded {
        id: GestureId,
        family: PatternFamily,
    },
    GestureCancelled {
        id: GestureId,
        family: PatternFamily,
    },
    GestureRejected {
        family: PatternFamily,
        reason: GestureRejectReason,
    },
    BeatCrossed {
        beat: u64,
    },
    SubdivisionCrossed {
        beat: u64,
        subdivision: Subdivision,
    },
    TempoAdopted {
        bpm: f32,
    },
    ParticleOverflow {
        dropped: u32,
    },
    Paused,
    Resumed,
}

/// A bounded FIFO of pending commands. Overflow drops the oldest command,
/// matching `AudioTap`'s staleness-over-completeness policy.
pub struct CommandQueue {
    queue: VecDeque<Command>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, command: Command) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(command);
    }

    pub fn drain(&mut self) -> Vec<Command> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// An event wrapped with its delivery-order sequence number and the
/// engine-local timestamp it was published at (spec §6: "monotonic
/// sequence number + engine-local timestamp + payload").
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub sequence: u64,
    pub timestamp_s: f64,
    pub payload: Event,
}

type Subscriber = Box<dyn FnMut(&EventEnvelope) -> Result<(), String>>;

/// Publishes events to every registered subscriber, isolating faults.
///
/// A subscriber that returns `Err` is logged and recorded on the frame's
/// diagnostics; it is not unsubscribed and does not prevent delivery to
/// the remaining subscribers (spec §5: "one bad subscriber must not break
/// the others").
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_sequence: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_sequence: 0,
        }
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&EventEnvelope) -> Result<(), String> + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Wrap `payload` in the next sequence number and publish it to every
    /// subscriber, returning the fault messages of any that failed so the
    /// caller can route them to diagnostics.
    pub fn publish(&mut self, payload: Event, timestamp_s: f64) -> Vec<String> {
        let envelope = EventEnvelope {
            sequence: self.next_sequence,
            timestamp_s,
            payload,
        };
        self.next_sequence += 1;

        let mut faults = Vec::new();
        for subscriber in &mut self.subscribers {
            if let Err(message) = subscriber(&envelope) {
                log::warn!("event subscriber fault: {message}");
                faults.push(message);
            }
        }
        faults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn command_queue_drains_in_fifo_order() {
        let mut q = CommandQueue::new(8);
        q.push(Command::SetBpm(100.0));
        q.push(Command::Pause);
        let drained = q.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], Command::SetBpm(_)));
        assert!(matches!(drained[1], Command::Pause));
        assert!(q.is_empty());
    }

    #[test]
    fn command_queue_overflow_drops_oldest() {
        let mut q = CommandQueue::new(1);
        q.push(Command::Pause);
        q.push(Command::Resume);
        let drained = q.drain();
        assert_eq!(drained.len(), 1);
        assert!(matches!(drained[0], Command::Resume));
    }

    #[test]
    fn event_bus_delivers_to_all_subscribers() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            let count = count.clone();
            bus.subscribe(move |_event| {
                *count.borrow_mut() += 1;
                Ok(())
            });
        }
        bus.publish(Event::BeatCrossed { beat: 1 }, 0.0);
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn event_bus_sequence_numbers_increase() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe(move |envelope| {
            seen_clone.borrow_mut().push(envelope.sequence);
            Ok(())
        });
        bus.publish(Event::BeatCrossed { beat: 1 }, 0.0);
        bus.publish(Event::BeatCrossed { beat: 2 }, 0.1);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn event_bus_isolates_a_faulty_subscriber() {
        let mut bus = EventBus::new();
        let good_count = Rc::new(RefCell::new(0));
        bus.subscribe(|_event| Err("boom".to_string()));
        let good_count_clone = good_count.clone();
        bus.subscribe(move |_event| {
            *good_count_clone.borrow_mut() += 1;
            Ok(())
        });

        let faults = bus.publish(Event::BeatCrossed { beat: 1 }, 0.0);
        assert_eq!(faults.len(), 1);
        assert_eq!(*good_count.borrow(), 1);
    }
}
