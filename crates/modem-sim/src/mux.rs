//! Simulated channel multiplexer

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modem_cellular::{Dlci, Multiplexer, MuxError, MuxListener, PipeHandle};
use tracing::debug;

use crate::completion::Completion;
use crate::pipe::SimPipe;

#[derive(Debug, Default)]
struct MuxState {
    attached: Option<String>,
    listener: Option<MuxListener>,
    connects: usize,
    releases: usize,
}

/// Multiplexer exposing two simulated channels
#[derive(Debug)]
pub struct SimMultiplexer {
    completion: Completion,
    state: Mutex<MuxState>,
    data: Arc<SimPipe>,
    command: Arc<SimPipe>,
}

impl SimMultiplexer {
    pub fn new(completion: Completion) -> Self {
        Self {
            completion,
            state: Mutex::new(MuxState::default()),
            data: Arc::new(SimPipe::new("dlci1", completion)),
            command: Arc::new(SimPipe::new("dlci2", completion)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MuxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The simulated channel for `dlci`
    pub fn sim_channel(&self, dlci: Dlci) -> Arc<SimPipe> {
        match dlci {
            Dlci::Data => Arc::clone(&self.data),
            Dlci::Command => Arc::clone(&self.command),
        }
    }

    /// Report the pending connect (manual completion)
    pub fn complete_connect(&self) -> bool {
        let listener = self.lock().listener.clone();
        match listener {
            Some(listener) => {
                listener.connected();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached.is_some()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn release_count(&self) -> usize {
        self.lock().releases
    }
}

impl Multiplexer for SimMultiplexer {
    fn attach(&self, pipe: PipeHandle) -> Result<(), MuxError> {
        let mut state = self.lock();
        if let Some(current) = &state.attached {
            return Err(MuxError::AlreadyAttached(current.clone()));
        }
        state.attached = Some(pipe.name().to_string());
        Ok(())
    }

    fn connect_async(&self, listener: MuxListener) -> Result<(), MuxError> {
        {
            let mut state = self.lock();
            if state.attached.is_none() {
                return Err(MuxError::NotAttached);
            }
            state.connects += 1;
            state.listener = Some(listener.clone());
        }
        debug!("sim multiplexer connecting");
        self.completion.schedule(move || listener.connected());
        Ok(())
    }

    fn channel(&self, dlci: Dlci) -> PipeHandle {
        self.sim_channel(dlci)
    }

    fn release(&self) {
        let mut state = self.lock();
        if state.attached.take().is_some() {
            state.releases += 1;
        }
        state.listener = None;
        self.data.reset();
        self.command.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modem_cellular::{EventQueue, ModemEvent, ModemPipe, PipeListener};

    #[test]
    fn test_connect_requires_attach() {
        let queue = EventQueue::default();
        let mux = SimMultiplexer::new(Completion::Immediate);
        assert_eq!(
            mux.connect_async(MuxListener::new(queue.sender())),
            Err(MuxError::NotAttached)
        );

        let uart: PipeHandle = Arc::new(SimPipe::new("uart", Completion::Immediate));
        mux.attach(uart.clone()).unwrap();
        assert_eq!(
            mux.attach(uart),
            Err(MuxError::AlreadyAttached("uart".into()))
        );
        mux.connect_async(MuxListener::new(queue.sender())).unwrap();
        assert_eq!(queue.drain(), vec![ModemEvent::MultiplexConnected]);
    }

    #[test]
    fn test_release_closes_channels() {
        let queue = EventQueue::default();
        let mux = SimMultiplexer::new(Completion::Immediate);
        let uart: PipeHandle = Arc::new(SimPipe::new("uart", Completion::Immediate));
        mux.attach(uart).unwrap();

        let data = mux.channel(Dlci::Data);
        data.attach(PipeListener::channel(queue.sender(), ModemEvent::Channel1Opened));
        data.open_async().unwrap();
        assert!(mux.sim_channel(Dlci::Data).is_open());

        mux.release();
        assert!(!mux.is_attached());
        assert!(!mux.sim_channel(Dlci::Data).is_open());
        // Reopening after release is allowed
        mux.channel(Dlci::Data).open_async().unwrap();
        assert_eq!(mux.release_count(), 1);
    }
}
