//! Simulated power and reset lines

use std::sync::{Mutex, MutexGuard, PoisonError};

use modem_cellular::{ControlLine, LineError};
use tracing::trace;

#[derive(Debug, Default)]
struct LineState {
    active: bool,
    history: Vec<bool>,
    fail: bool,
}

/// A control line that records every level it is driven to
#[derive(Debug)]
pub struct SimLine {
    name: String,
    state: Mutex<LineState>,
}

impl SimLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LineState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Every level driven so far, oldest first
    pub fn history(&self) -> Vec<bool> {
        self.lock().history.clone()
    }

    /// Number of active pulses started
    pub fn pulse_count(&self) -> usize {
        self.lock().history.iter().filter(|active| **active).count()
    }

    /// Make later writes fail (or succeed again)
    pub fn set_fail(&self, fail: bool) {
        self.lock().fail = fail;
    }
}

impl ControlLine for SimLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_active(&self, active: bool) -> Result<(), LineError> {
        let mut state = self.lock();
        if state.fail {
            return Err(LineError::Drive {
                line: self.name.clone(),
                reason: "simulated failure".into(),
            });
        }
        trace!("{} line {}", self.name, if active { "active" } else { "inactive" });
        state.active = active;
        state.history.push(active);
        Ok(())
    }
}
