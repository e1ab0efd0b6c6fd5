//! A complete simulated modem
//!
//! [`SimParts`] builds one of each simulated collaborator and hands them to
//! the orchestrator as [`ModemResources`]. The parts stay reachable for
//! inspection and for injecting failures while the modem runs.

use std::sync::Arc;

use modem_cellular::{LineHandle, ModemCellular, ModemConfig, ModemResources};
use serde::{Deserialize, Serialize};

use crate::chat::SimChatDriver;
use crate::completion::Completion;
use crate::line::SimLine;
use crate::link::SimLink;
use crate::mux::SimMultiplexer;
use crate::pipe::SimPipe;

/// How the simulated modem is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimModemOptions {
    /// Wire a power key line
    pub power_line: bool,
    /// Wire a reset line
    pub reset_line: bool,
    /// When collaborators report completion
    pub completion: Completion,
}

impl Default for SimModemOptions {
    fn default() -> Self {
        Self {
            power_line: true,
            reset_line: true,
            completion: Completion::Immediate,
        }
    }
}

/// The simulated collaborators of one modem
#[derive(Debug, Clone)]
pub struct SimParts {
    pub pipe: Arc<SimPipe>,
    pub mux: Arc<SimMultiplexer>,
    pub chat: Arc<SimChatDriver>,
    pub link: Arc<SimLink>,
    pub power: Option<Arc<SimLine>>,
    pub reset: Option<Arc<SimLine>>,
}

impl SimParts {
    pub fn new(options: SimModemOptions) -> Self {
        let completion = options.completion;
        Self {
            pipe: Arc::new(SimPipe::new("sim-uart", completion)),
            mux: Arc::new(SimMultiplexer::new(completion)),
            chat: Arc::new(SimChatDriver::new(completion)),
            link: Arc::new(SimLink::new()),
            power: options.power_line.then(|| Arc::new(SimLine::new("power"))),
            reset: options.reset_line.then(|| Arc::new(SimLine::new("reset"))),
        }
    }

    /// Orchestrator resources backed by these parts
    pub fn resources(&self) -> ModemResources {
        ModemResources {
            pipe: self.pipe.clone(),
            mux: self.mux.clone(),
            chat: self.chat.clone(),
            link: self.link.clone(),
            power: self.power.clone().map(|line| line as LineHandle),
            reset: self.reset.clone().map(|line| line as LineHandle),
        }
    }
}

/// A running modem wired to simulated parts
#[derive(Debug)]
pub struct SimModem {
    pub modem: ModemCellular,
    pub parts: SimParts,
}

impl SimModem {
    /// Build the parts and spawn the modem on the current runtime
    pub fn spawn(config: ModemConfig, options: SimModemOptions) -> Self {
        let parts = SimParts::new(options);
        let modem = ModemCellular::spawn(config, parts.resources());
        Self { modem, parts }
    }

    /// Stop the modem actor
    pub async fn shutdown(self) {
        self.modem.shutdown().await;
    }
}
