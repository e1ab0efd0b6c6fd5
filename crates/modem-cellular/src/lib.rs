//! Cellular Modem Orchestrator
//!
//! This crate brings a cellular modem from powered-off to an IP-carrying
//! link, keeps it registered and tears it down again. A single state machine
//! sequences power control, a channel multiplexer and a command/response
//! chat driver over one serial transport.
//!
//! # Architecture
//!
//! All asynchronous notifications are posted as [`ModemEvent`]s to a bounded
//! [`EventQueue`]. Nothing calls into the state machine directly:
//!
//! - Pipes, the multiplexer and the chat driver report through listeners
//!   that hold an [`EventSender`]
//! - The [`TimeoutTimer`] posts `Timeout` when its deadline passes
//! - [`ModemCellular::resume`] and [`ModemCellular::suspend`] post the power
//!   management events
//!
//! The modem actor ([`actor::run_modem_actor`]) is the sole consumer. It
//! drains the queue into the [`ModemStateMachine`], which runs the leave
//! hook, assigns the new state and runs the enter hook for every transition.
//!
//! Collaborators are traits ([`ModemPipe`], [`Multiplexer`], [`ChatDriver`],
//! [`IpLink`], [`ControlLine`]) so the orchestrator can be driven by real
//! engines or by the simulations in `modem-sim`.
//!
//! # Example
//!
//! ```rust,ignore
//! use modem_cellular::{ModemCellular, ModemConfig, ModemState, SignalType};
//! use std::time::Duration;
//!
//! let modem = ModemCellular::spawn(ModemConfig::default(), resources);
//! modem.resume();
//! modem.wait_for_state(ModemState::CarrierOn, Duration::from_secs(60)).await?;
//!
//! let rssi = modem.get_signal(SignalType::Rssi).await?;
//! modem.suspend().await?;
//! ```

pub mod actor;
pub mod chat;
pub mod cmux;
pub mod config;
pub mod error;
pub mod events;
pub mod info;
pub mod line;
pub mod link;
pub mod machine;
pub mod modem;
pub mod pipe;
pub mod queue;
pub mod serial;
pub mod state;
pub mod timer;

#[cfg(test)]
mod test_support;

// Re-export actor types
pub use actor::{run_modem_actor, ModemCommand};

// Re-export collaborator contracts
pub use chat::{ChatDriver, ChatHandle, ChatListener};
pub use cmux::{Dlci, MuxHandle, MuxListener, Multiplexer};
pub use line::{ControlLine, LineHandle};
pub use link::{IpLink, LinkHandle};
pub use pipe::{ModemPipe, PipeEvent, PipeHandle, PipeListener};
pub use serial::SerialPipe;

// Re-export orchestrator types
pub use config::{ModemConfig, ModemResources};
pub use error::{ChatError, LineError, LinkError, ModemError, MuxError, PipeError};
pub use events::ModemEvent;
pub use info::{ModemInfo, ModemInfoType, SharedInfo, SignalType};
pub use machine::ModemStateMachine;
pub use modem::ModemCellular;
pub use queue::{EventQueue, EventSender, DEFAULT_EVENT_QUEUE_CAPACITY};
pub use state::ModemState;
pub use timer::TimeoutTimer;
