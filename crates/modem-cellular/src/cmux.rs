//! Multiplexed channel manager contract
//!
//! Once the init script has switched the modem into multiplexing mode, the
//! physical pipe belongs to the multiplexer. It carves the pipe into two
//! logical channels: DLCI 1 carries IP-framed data and DLCI 2 carries chat
//! traffic. The framing itself is the implementor's business.

use std::fmt;
use std::sync::Arc;

use crate::error::MuxError;
use crate::events::ModemEvent;
use crate::pipe::PipeHandle;
use crate::queue::EventSender;

/// Logical channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dlci {
    /// DLCI 1, IP data
    Data,
    /// DLCI 2, commands
    Command,
}

impl Dlci {
    /// Numeric address on the wire
    pub fn address(&self) -> u8 {
        match self {
            Dlci::Data => 1,
            Dlci::Command => 2,
        }
    }

    /// Event posted when this channel opens
    pub fn opened_event(&self) -> ModemEvent {
        match self {
            Dlci::Data => ModemEvent::Channel1Opened,
            Dlci::Command => ModemEvent::Channel2Opened,
        }
    }
}

impl fmt::Display for Dlci {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dlci{}", self.address())
    }
}

/// Receives multiplexer notifications
#[derive(Debug, Clone)]
pub struct MuxListener {
    events: EventSender,
}

impl MuxListener {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// The connect handshake completed
    pub fn connected(&self) {
        self.events.post(ModemEvent::MultiplexConnected);
    }
}

/// Channel multiplexer
pub trait Multiplexer: Send + Sync + fmt::Debug {
    /// Take ownership of the physical pipe
    fn attach(&self, pipe: PipeHandle) -> Result<(), MuxError>;

    /// Start the connect handshake; completion goes to `listener`
    fn connect_async(&self, listener: MuxListener) -> Result<(), MuxError>;

    /// Logical channel pipe; ownership stays with the multiplexer
    fn channel(&self, dlci: Dlci) -> PipeHandle;

    /// Give the physical pipe back
    fn release(&self);
}

/// Shared handle to a multiplexer
pub type MuxHandle = Arc<dyn Multiplexer>;
