//! Power and reset control lines

use std::fmt;
use std::sync::Arc;

use crate::error::LineError;

/// A digital output wired to the modem's power key or reset pin
pub trait ControlLine: Send + Sync + fmt::Debug {
    /// Line name used in logs
    fn name(&self) -> &str;

    /// Drive the line to its active or inactive level
    fn set_active(&self, active: bool) -> Result<(), LineError>;
}

/// Shared handle to a control line
pub type LineHandle = Arc<dyn ControlLine>;
