//! Error types for the modem orchestrator and its collaborators

use thiserror::Error;

use crate::state::ModemState;

/// Errors reported by a transport pipe
#[derive(Debug, Error)]
pub enum PipeError {
    /// The pipe is not open
    #[error("pipe {0} is not open")]
    NotOpen(String),

    /// The pipe is already open or opening
    #[error("pipe {0} is busy")]
    Busy(String),

    /// Opening the underlying device failed
    #[error("failed to open {port}: {source}")]
    Open {
        /// Device path
        port: String,
        /// Cause
        source: tokio_serial::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by the channel multiplexer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MuxError {
    /// No pipe is attached
    #[error("no pipe attached to multiplexer")]
    NotAttached,

    /// A pipe is already attached
    #[error("multiplexer already attached to {0}")]
    AlreadyAttached(String),
}

/// Errors reported by a chat driver
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// A script is already running
    #[error("chat driver busy running {0}")]
    Busy(String),

    /// No pipe is attached
    #[error("chat driver not attached")]
    NotAttached,

    /// Another pipe is still attached and must be released first
    #[error("chat driver already attached to {0}")]
    AlreadyAttached(String),

    /// The script hit one of its abort patterns
    #[error("script {0} aborted")]
    Aborted(String),
}

/// Errors reported by the IP link layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link layer could not bind to the pipe
    #[error("link could not attach to {0}")]
    AttachFailed(String),

    /// The link layer is not bound to a pipe
    #[error("link not attached")]
    NotAttached,
}

/// Errors reported by a power or reset control line
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Driving the line failed
    #[error("failed to drive {line} line: {reason}")]
    Drive {
        /// Line name
        line: String,
        /// Cause reported by the line driver
        reason: String,
    },

    /// The state needs a control line that is not configured
    #[error("{0} line not configured")]
    Missing(&'static str),
}

/// Errors surfaced by the modem orchestrator
#[derive(Debug, Error)]
pub enum ModemError {
    /// The modem has no data to offer (not registered, or the query timed out)
    #[error("no data available")]
    NoData,

    /// The modem reported the signal figure as not known
    #[error("signal not known or not detectable")]
    SignalUnknown,

    /// Suspend did not reach the idle state in time
    #[error("suspend timed out after {timeout_ms}ms in state {state}")]
    SuspendTimeout {
        /// Configured bound
        timeout_ms: u64,
        /// State observed when the bound expired
        state: ModemState,
    },

    /// The modem did not reach a state in time
    #[error("timed out waiting for state {0}")]
    StateTimeout(ModemState),

    /// The modem actor has stopped
    #[error("modem actor is not running")]
    ActorGone,

    /// Pipe error
    #[error("pipe error: {0}")]
    Pipe(#[from] PipeError),

    /// Multiplexer error
    #[error("multiplexer error: {0}")]
    Mux(#[from] MuxError),

    /// Chat error
    #[error("chat error: {0}")]
    Chat(#[from] ChatError),

    /// Link error
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Control line error
    #[error("line error: {0}")]
    Line(#[from] LineError),
}
