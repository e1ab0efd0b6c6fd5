//! Modem Chat Vocabulary
//!
//! This crate describes the line-oriented command/response ("chat")
//! exchanges used to drive a cellular modem:
//!
//! - **Scripts**: ordered request/response steps with abort patterns and an
//!   overall timeout
//! - **Responses**: typed parsing of matched response arguments (identity,
//!   `+CSQ`, `+CESQ`, `+CxREG`)
//! - **Registration**: network registration status and access technologies
//! - **Signal**: conversion of raw signal indices to dBm/dB
//!
//! The crate carries no I/O. Executing a script belongs to a chat driver.
//!
//! # Example
//!
//! ```rust
//! use modem_chat::{scripts, ChatResponse};
//!
//! let script = scripts::csq_script();
//! let m = &script.chats[0].response_matches[0];
//! let argv = m.split("+CSQ: 20,99").unwrap();
//!
//! let response = ChatResponse::parse(m.handler.unwrap(), &argv).unwrap();
//! assert_eq!(response, ChatResponse::Csq { rssi: 20 });
//! ```

pub mod error;
pub mod registration;
pub mod response;
pub mod script;
pub mod scripts;
pub mod signal;

pub use error::ParseError;
pub use registration::{AccessTechnology, RegistrationSource, RegistrationStatus};
pub use response::ChatResponse;
pub use script::{ChatMatch, ChatScript, MatchHandler, ScriptChat, ScriptResult};
