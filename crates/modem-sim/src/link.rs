//! Simulated IP link layer

use std::sync::{Mutex, MutexGuard, PoisonError};

use modem_cellular::{IpLink, LinkError, PipeHandle};
use tracing::debug;

#[derive(Debug, Default)]
struct LinkState {
    attached: Option<String>,
    carrier: bool,
    link_addr: Option<Vec<u8>>,
    attaches: usize,
    releases: usize,
    carrier_ons: usize,
}

/// Link layer that only records what it was asked to do
#[derive(Debug, Default)]
pub struct SimLink {
    state: Mutex<LinkState>,
}

impl SimLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached.is_some()
    }

    pub fn has_carrier(&self) -> bool {
        self.lock().carrier
    }

    /// Last hardware address set
    pub fn link_addr(&self) -> Option<Vec<u8>> {
        self.lock().link_addr.clone()
    }

    pub fn attach_count(&self) -> usize {
        self.lock().attaches
    }

    pub fn release_count(&self) -> usize {
        self.lock().releases
    }

    /// Number of times the carrier was raised
    pub fn carrier_on_count(&self) -> usize {
        self.lock().carrier_ons
    }
}

impl IpLink for SimLink {
    fn attach(&self, pipe: PipeHandle) -> Result<(), LinkError> {
        let mut state = self.lock();
        if state.attached.is_some() {
            return Err(LinkError::AttachFailed(pipe.name().to_string()));
        }
        state.attached = Some(pipe.name().to_string());
        state.attaches += 1;
        Ok(())
    }

    fn release(&self) {
        let mut state = self.lock();
        if state.attached.take().is_some() {
            state.releases += 1;
        }
        state.carrier = false;
    }

    fn carrier_on(&self) {
        let mut state = self.lock();
        state.carrier = true;
        state.carrier_ons += 1;
        debug!("sim link carrier on");
    }

    fn carrier_off(&self) {
        self.lock().carrier = false;
        debug!("sim link carrier off");
    }

    fn set_link_addr(&self, addr: &[u8]) -> Result<(), LinkError> {
        self.lock().link_addr = Some(addr.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Completion;
    use crate::pipe::SimPipe;
    use std::sync::Arc;

    #[test]
    fn test_attach_is_exclusive_until_release() {
        let link = SimLink::new();
        let dlci1: PipeHandle = Arc::new(SimPipe::new("dlci1", Completion::Immediate));
        link.attach(dlci1.clone()).unwrap();
        assert!(link.attach(dlci1.clone()).is_err());

        link.carrier_on();
        link.release();
        assert!(!link.has_carrier());
        link.attach(dlci1).unwrap();
        assert_eq!(link.attach_count(), 2);
    }
}
