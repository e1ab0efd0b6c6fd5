//! Modem Simulation Library
//!
//! Simulated collaborators for driving the cellular orchestrator without a
//! modem attached:
//!
//! - **SimPipe**: a transport pipe that opens and closes on request
//! - **SimMultiplexer**: a multiplexer with two simulated channels
//! - **SimChatDriver**: a chat driver answering scripts from response tables
//! - **SimLink** / **SimLine**: recorders for the link layer and control lines
//!
//! Every part reports completion according to a shared [`Completion`]
//! policy: immediately, after a delay, or only when a test says so.
//!
//! # Example
//!
//! ```rust,ignore
//! use modem_cellular::{ModemConfig, ModemState};
//! use modem_sim::{SimModem, SimModemOptions};
//!
//! let sim = SimModem::spawn(ModemConfig::default(), SimModemOptions::default());
//! sim.modem.resume();
//! sim.modem.wait_for_state(ModemState::CarrierOn, timeout).await?;
//! assert!(sim.parts.link.has_carrier());
//! ```

pub mod chat;
pub mod completion;
pub mod line;
pub mod link;
pub mod modem;
pub mod mux;
pub mod pipe;

pub use chat::{default_responses, SimChatDriver, SimResponse};
pub use completion::Completion;
pub use line::SimLine;
pub use link::SimLink;
pub use modem::{SimModem, SimModemOptions, SimParts};
pub use mux::SimMultiplexer;
pub use pipe::SimPipe;
