//! Bounded event queue
//!
//! Multi-producer, single-consumer FIFO of [`ModemEvent`] codes. Producers
//! hold an [`EventSender`] and never block: `post` takes a short lock, pushes
//! the event and wakes the consumer. When the queue is full the new event is
//! dropped and counted, so a burst of notifications can never stall the
//! context that produced it.
//!
//! The consumer side, [`EventQueue`], is owned by the modem actor. It waits
//! for a wake-up and then pops events one at a time, so an event removed from
//! the queue while a drain is in progress (see [`EventSender::purge`]) is
//! never delivered.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::warn;

use crate::events::ModemEvent;

/// Default number of pending events
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 8;

#[derive(Debug)]
struct Shared {
    events: Mutex<VecDeque<ModemEvent>>,
    capacity: usize,
    dropped: AtomicU64,
    wake: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<ModemEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Consumer side of the event queue
#[derive(Debug)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

/// Producer handle for the event queue
#[derive(Debug, Clone)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` pending events
    ///
    /// Storage grows on demand, so a large `capacity` costs nothing up front.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                events: Mutex::new(VecDeque::new()),
                capacity,
                dropped: AtomicU64::new(0),
                wake: Notify::new(),
            }),
        }
    }

    /// Create a producer handle
    pub fn sender(&self) -> EventSender {
        EventSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Remove the oldest pending event
    pub fn pop(&self) -> Option<ModemEvent> {
        self.shared.lock().pop_front()
    }

    /// Remove every pending event, oldest first
    pub fn drain(&self) -> Vec<ModemEvent> {
        self.shared.lock().drain(..).collect()
    }

    /// Wait until a producer posts an event
    ///
    /// A post that happens while nobody is waiting is remembered, so the next
    /// call returns immediately.
    pub async fn wait(&self) {
        self.shared.wake.notified().await;
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Whether no events are pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of pending events
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of events dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_QUEUE_CAPACITY)
    }
}

impl EventSender {
    /// Post an event
    ///
    /// Returns `false` if the queue was full and the event was dropped.
    pub fn post(&self, event: ModemEvent) -> bool {
        {
            let mut events = self.shared.lock();
            if events.len() >= self.shared.capacity {
                drop(events);
                let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("event queue full, dropped {} ({} dropped so far)", event, dropped);
                return false;
            }
            events.push_back(event);
        }
        self.shared.wake.notify_one();
        true
    }

    /// Remove every pending occurrence of `event`, returning how many were removed
    pub fn purge(&self, event: ModemEvent) -> usize {
        let mut events = self.shared.lock();
        let before = events.len();
        events.retain(|e| *e != event);
        before - events.len()
    }

    /// Number of events dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
