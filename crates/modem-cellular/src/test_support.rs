//! No-op collaborators for unit tests inside this crate

use std::sync::Arc;

use modem_chat::{ChatScript, ScriptResult};
use tokio::sync::oneshot;

use crate::chat::{ChatDriver, ChatListener};
use crate::cmux::{Dlci, MuxListener, Multiplexer};
use crate::config::ModemResources;
use crate::error::{ChatError, LinkError, MuxError, PipeError};
use crate::link::IpLink;
use crate::pipe::{ModemPipe, PipeHandle, PipeListener};

#[derive(Debug)]
pub struct InertPipe;

impl ModemPipe for InertPipe {
    fn name(&self) -> &str {
        "inert"
    }
    fn attach(&self, _listener: PipeListener) {}
    fn release(&self) {}
    fn open_async(&self) -> Result<(), PipeError> {
        Ok(())
    }
    fn close_async(&self) -> Result<(), PipeError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct InertMux;

impl Multiplexer for InertMux {
    fn attach(&self, _pipe: PipeHandle) -> Result<(), MuxError> {
        Ok(())
    }
    fn connect_async(&self, _listener: MuxListener) -> Result<(), MuxError> {
        Ok(())
    }
    fn channel(&self, _dlci: Dlci) -> PipeHandle {
        Arc::new(InertPipe)
    }
    fn release(&self) {}
}

#[derive(Debug)]
pub struct InertChat;

impl ChatDriver for InertChat {
    fn attach(&self, _pipe: PipeHandle, _listener: ChatListener) -> Result<(), ChatError> {
        Ok(())
    }
    fn release(&self) {}
    fn run_script_async(&self, _script: Arc<ChatScript>) -> Result<(), ChatError> {
        Ok(())
    }
    fn run_script(
        &self,
        _script: Arc<ChatScript>,
    ) -> Result<oneshot::Receiver<ScriptResult>, ChatError> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(ScriptResult::Success);
        Ok(rx)
    }
}

#[derive(Debug)]
pub struct InertLink;

impl IpLink for InertLink {
    fn attach(&self, _pipe: PipeHandle) -> Result<(), LinkError> {
        Ok(())
    }
    fn release(&self) {}
    fn carrier_on(&self) {}
    fn carrier_off(&self) {}
    fn set_link_addr(&self, _addr: &[u8]) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Resources with no control lines whose collaborators accept everything
pub fn inert_resources() -> ModemResources {
    ModemResources {
        pipe: Arc::new(InertPipe),
        mux: Arc::new(InertMux),
        chat: Arc::new(InertChat),
        link: Arc::new(InertLink),
        power: None,
        reset: None,
    }
}
