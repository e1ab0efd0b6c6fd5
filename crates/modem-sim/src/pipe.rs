//! Simulated transport pipe

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modem_cellular::{ModemPipe, PipeError, PipeEvent, PipeListener};
use tracing::debug;

use crate::completion::Completion;

#[derive(Debug, Default)]
struct PipeState {
    listener: Option<PipeListener>,
    open: bool,
    opens: usize,
    closes: usize,
}

/// A pipe that opens and closes without any device behind it
#[derive(Debug)]
pub struct SimPipe {
    name: String,
    completion: Completion,
    state: Arc<Mutex<PipeState>>,
}

impl SimPipe {
    pub fn new(name: impl Into<String>, completion: Completion) -> Self {
        Self {
            name: name.into(),
            completion,
            state: Arc::new(Mutex::new(PipeState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(state: &Mutex<PipeState>, open: bool) {
        let listener = {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.open = open;
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener.notify(if open {
                PipeEvent::Opened
            } else {
                PipeEvent::Closed
            });
        }
    }

    /// Finish a pending open (manual completion)
    pub fn complete_open(&self) {
        Self::finish(&self.state, true);
    }

    /// Finish a pending close (manual completion)
    pub fn complete_close(&self) {
        Self::finish(&self.state, false);
    }

    /// Drop back to closed and detached without notifying
    pub fn reset(&self) {
        let mut state = self.lock();
        state.open = false;
        state.listener = None;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn is_attached(&self) -> bool {
        self.lock().listener.is_some()
    }

    /// Number of `open_async` calls accepted
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    /// Number of `close_async` calls that closed an open pipe
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }
}

impl ModemPipe for SimPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&self, listener: PipeListener) {
        self.lock().listener = Some(listener);
    }

    fn release(&self) {
        self.lock().listener = None;
    }

    fn open_async(&self) -> Result<(), PipeError> {
        {
            let mut state = self.lock();
            if state.open {
                return Err(PipeError::Busy(self.name.clone()));
            }
            state.opens += 1;
        }
        debug!("sim pipe {} opening", self.name);
        let state = Arc::clone(&self.state);
        self.completion
            .schedule(move || SimPipe::finish(&state, true));
        Ok(())
    }

    fn close_async(&self) -> Result<(), PipeError> {
        {
            let mut state = self.lock();
            if !state.open {
                return Ok(());
            }
            state.closes += 1;
        }
        debug!("sim pipe {} closing", self.name);
        let state = Arc::clone(&self.state);
        self.completion
            .schedule(move || SimPipe::finish(&state, false));
        Ok(())
    }
}
