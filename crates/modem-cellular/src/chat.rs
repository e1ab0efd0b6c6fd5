//! Chat driver contract
//!
//! The chat driver executes [`ChatScript`]s against one attached pipe at a
//! time. Asynchronous runs report their outcome through the attached
//! [`ChatListener`], which turns it into a script event. Synchronous runs
//! hand their outcome back through a oneshot channel and never touch the
//! event queue.
//!
//! In both cases every response matched with a [`MatchHandler`] is passed to
//! [`ChatListener::on_match`], which updates the shared identity/signal cache
//! and raises registration events.

use std::fmt;
use std::sync::Arc;

use modem_chat::{ChatResponse, ChatScript, MatchHandler, ScriptResult};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::events::ModemEvent;
use crate::info::SharedInfo;
use crate::pipe::PipeHandle;
use crate::queue::EventSender;

/// Receives chat driver notifications
#[derive(Debug, Clone)]
pub struct ChatListener {
    events: EventSender,
    info: SharedInfo,
}

impl ChatListener {
    pub fn new(events: EventSender, info: SharedInfo) -> Self {
        Self { events, info }
    }

    /// An asynchronous script finished
    pub fn script_finished(&self, script: &str, result: ScriptResult) {
        debug!("script {} finished: {}", script, result);
        let event = if result.is_success() {
            ModemEvent::ScriptSuccess
        } else {
            ModemEvent::ScriptFailed
        };
        self.events.post(event);
    }

    /// A response matched with `handler` arrived; `argv[0]` is the match token
    pub fn on_match(&self, handler: MatchHandler, argv: &[&str]) {
        let response = match ChatResponse::parse(handler, argv) {
            Ok(response) => response,
            Err(e) => {
                warn!("ignoring {:?} response: {}", handler, e);
                return;
            }
        };

        let registered = {
            let mut info = self.info.lock();
            info.apply(&response);
            info.is_registered()
        };

        if let ChatResponse::Registration { source, status } = response {
            debug!("{:?} registration: {}", source, status);
            self.events.post(if registered {
                ModemEvent::Registered
            } else {
                ModemEvent::Deregistered
            });
        }
    }
}

/// Command/response script engine
pub trait ChatDriver: Send + Sync + fmt::Debug {
    /// Bind to `pipe`; fails if another pipe is still attached
    fn attach(&self, pipe: PipeHandle, listener: ChatListener) -> Result<(), ChatError>;

    /// Unbind from the current pipe; a no-op when nothing is attached
    fn release(&self);

    /// Start a script; the outcome goes to [`ChatListener::script_finished`]
    fn run_script_async(&self, script: Arc<ChatScript>) -> Result<(), ChatError>;

    /// Start a script whose outcome is returned through the receiver
    fn run_script(
        &self,
        script: Arc<ChatScript>,
    ) -> Result<oneshot::Receiver<ScriptResult>, ChatError>;
}

/// Shared handle to a chat driver
pub type ChatHandle = Arc<dyn ChatDriver>;
