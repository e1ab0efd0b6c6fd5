//! Transport pipe abstraction
//!
//! A pipe is a byte stream that opens and closes asynchronously. The
//! orchestrator only schedules opens and closes; completion comes back
//! through a [`PipeListener`], which turns it into an event on the queue.

use std::fmt;
use std::sync::Arc;

use crate::error::PipeError;
use crate::events::ModemEvent;
use crate::queue::EventSender;

/// Notification raised by a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipeEvent {
    /// The pipe finished opening
    Opened,
    /// The pipe finished closing
    Closed,
    /// Data is waiting to be received
    ReceiveReady,
}

/// Maps pipe notifications onto orchestrator events
#[derive(Debug, Clone)]
pub struct PipeListener {
    events: EventSender,
    opened: Option<ModemEvent>,
    closed: Option<ModemEvent>,
}

impl PipeListener {
    /// Create a listener posting `opened` and `closed` when they are set
    pub fn new(
        events: EventSender,
        opened: Option<ModemEvent>,
        closed: Option<ModemEvent>,
    ) -> Self {
        Self {
            events,
            opened,
            closed,
        }
    }

    /// Listener for the physical pipe
    pub fn bus(events: EventSender) -> Self {
        Self::new(
            events,
            Some(ModemEvent::BusOpened),
            Some(ModemEvent::BusClosed),
        )
    }

    /// Listener for a logical channel that reports only its opening
    pub fn channel(events: EventSender, opened: ModemEvent) -> Self {
        Self::new(events, Some(opened), None)
    }

    /// Deliver a pipe notification
    pub fn notify(&self, event: PipeEvent) {
        let mapped = match event {
            PipeEvent::Opened => self.opened,
            PipeEvent::Closed => self.closed,
            PipeEvent::ReceiveReady => None,
        };
        if let Some(mapped) = mapped {
            self.events.post(mapped);
        }
    }
}

/// An asynchronously opened byte stream
pub trait ModemPipe: Send + Sync + fmt::Debug {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Install the listener, replacing any previous one
    fn attach(&self, listener: PipeListener);

    /// Remove the listener
    fn release(&self);

    /// Start opening; completion is reported as [`PipeEvent::Opened`]
    fn open_async(&self) -> Result<(), PipeError>;

    /// Start closing; completion is reported as [`PipeEvent::Closed`]
    fn close_async(&self) -> Result<(), PipeError>;
}

/// Shared handle to a pipe
pub type PipeHandle = Arc<dyn ModemPipe>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;

    #[test]
    fn test_bus_listener_maps_both_edges() {
        let queue = EventQueue::default();
        let listener = PipeListener::bus(queue.sender());
        listener.notify(PipeEvent::Opened);
        listener.notify(PipeEvent::ReceiveReady);
        listener.notify(PipeEvent::Closed);

        assert_eq!(
            queue.drain(),
            vec![ModemEvent::BusOpened, ModemEvent::BusClosed]
        );
    }

    #[test]
    fn test_channel_listener_ignores_close() {
        let queue = EventQueue::default();
        let listener = PipeListener::channel(queue.sender(), ModemEvent::Channel2Opened);
        listener.notify(PipeEvent::Closed);
        listener.notify(PipeEvent::Opened);

        assert_eq!(queue.drain(), vec![ModemEvent::Channel2Opened]);
    }
}
