//! Modem handle
//!
//! [`ModemCellular`] is the public face of one modem. It spawns the actor,
//! maps power-management requests onto events and runs synchronous queries
//! against the command channel while the modem is in a steady state.

use std::sync::Arc;
use std::time::Duration;

use modem_chat::signal::{rsrp_dbm, rsrq_db, rssi_dbm};
use modem_chat::{scripts, AccessTechnology, ChatScript, RegistrationStatus, ScriptResult};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actor::{run_modem_actor, ModemCommand};
use crate::chat::ChatHandle;
use crate::config::{ModemConfig, ModemResources};
use crate::error::{ChatError, ModemError};
use crate::events::ModemEvent;
use crate::info::{ModemInfo, ModemInfoType, SharedInfo, SignalType};
use crate::machine::ModemStateMachine;
use crate::queue::{EventQueue, EventSender};
use crate::state::ModemState;

/// Slack added to a script's own timeout while waiting for its result
const SCRIPT_REPLY_MARGIN: Duration = Duration::from_secs(1);

/// Handle to a running modem
#[derive(Debug)]
pub struct ModemCellular {
    config: Arc<ModemConfig>,
    events: EventSender,
    state_rx: watch::Receiver<ModemState>,
    suspended_rx: watch::Receiver<u64>,
    info: SharedInfo,
    chat: ChatHandle,
    csq_script: Arc<ChatScript>,
    cesq_script: Arc<ChatScript>,
    cmd_tx: mpsc::Sender<ModemCommand>,
    task: JoinHandle<()>,
}

impl ModemCellular {
    /// Spawn the modem actor on the current tokio runtime
    ///
    /// The modem starts in `Idle`; call [`resume`](Self::resume) to bring it up.
    pub fn spawn(config: ModemConfig, resources: ModemResources) -> Self {
        let queue = EventQueue::new(config.event_queue_capacity);
        let events = queue.sender();
        let info = SharedInfo::default();
        let chat = Arc::clone(&resources.chat);

        let mut machine =
            ModemStateMachine::new(config.clone(), resources, events.clone(), info.clone());
        // Confirm the first Idle before any caller can wait on it
        machine.start();
        let state_rx = machine.subscribe();
        let suspended_rx = machine.subscribe_suspended();

        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let task = tokio::spawn(run_modem_actor(machine, queue, cmd_rx));

        Self {
            config: Arc::new(config),
            events,
            state_rx,
            suspended_rx,
            info,
            chat,
            csq_script: Arc::new(scripts::csq_script()),
            cesq_script: Arc::new(scripts::cesq_script()),
            cmd_tx,
            task,
        }
    }

    /// Request bring-up
    pub fn resume(&self) {
        info!("modem resume requested");
        self.events.post(ModemEvent::Resume);
    }

    /// Request tear-down and wait until the modem is idle
    ///
    /// Only an `Idle` confirmation that follows this request counts, so events
    /// queued ahead of it (a pending `Resume`, say) are handled first. Waits at
    /// most `suspend_timeout_ms`; on expiry the modem keeps tearing down in the
    /// background and [`ModemError::SuspendTimeout`] is returned.
    pub async fn suspend(&self) -> Result<(), ModemError> {
        info!("modem suspend requested");
        let mut suspended = self.suspended_rx.clone();
        let seen = *suspended.borrow_and_update();
        self.events.post(ModemEvent::Suspend);

        let waited = tokio::time::timeout(
            self.config.suspend_timeout(),
            suspended.wait_for(|generation| *generation > seen),
        )
        .await;
        match waited {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(ModemError::ActorGone),
            Err(_) => Err(ModemError::SuspendTimeout {
                timeout_ms: self.config.suspend_timeout_ms,
                state: self.state(),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> ModemState {
        *self.state_rx.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ModemState> {
        self.state_rx.clone()
    }

    /// Wait until the modem reaches `state`, for at most `timeout`
    pub async fn wait_for_state(
        &self,
        state: ModemState,
        timeout: Duration,
    ) -> Result<(), ModemError> {
        let mut rx = self.state_rx.clone();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|s| *s == state)).await;
        match waited {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(ModemError::ActorGone),
            Err(_) => Err(ModemError::StateTimeout(state)),
        }
    }

    /// Configuration the modem was spawned with
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Producer handle for injecting events
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Number of events dropped because the queue was full
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Run a script on the command channel and wait for its outcome
    ///
    /// Only valid in `AwaitRegistered` or `CarrierOn`; in any other state this
    /// fails with [`ModemError::NoData`] without touching the chat driver. A
    /// script timeout is also reported as `NoData`. The outcome is returned
    /// here and is not posted to the event queue.
    pub async fn run_script(&self, script: Arc<ChatScript>) -> Result<(), ModemError> {
        let state = self.state();
        if !state.is_steady() {
            debug!("script {} refused in state {}", script.name, state);
            return Err(ModemError::NoData);
        }

        let name = script.name.clone();
        let bound = script.timeout() + SCRIPT_REPLY_MARGIN;
        let reply = self.chat.run_script(script)?;

        match tokio::time::timeout(bound, reply).await {
            Ok(Ok(ScriptResult::Success)) => Ok(()),
            Ok(Ok(ScriptResult::Abort)) => Err(ChatError::Aborted(name).into()),
            Ok(Ok(ScriptResult::Timeout)) | Ok(Err(_)) | Err(_) => {
                debug!("script {} produced no data", name);
                Err(ModemError::NoData)
            }
        }
    }

    /// Query a signal figure
    pub async fn get_signal(&self, kind: SignalType) -> Result<i16, ModemError> {
        let script = match kind {
            SignalType::Rssi => &self.csq_script,
            SignalType::Rsrp | SignalType::Rsrq => &self.cesq_script,
        };
        self.run_script(Arc::clone(script)).await?;

        let info = self.info.snapshot();
        let value = match kind {
            SignalType::Rssi => rssi_dbm(info.rssi),
            SignalType::Rsrp => rsrp_dbm(info.rsrp),
            SignalType::Rsrq => rsrq_db(info.rsrq),
        };
        value.ok_or(ModemError::SignalUnknown)
    }

    /// Cached identity string
    pub fn modem_info(&self, kind: ModemInfoType) -> String {
        self.info.lock().get(kind).to_string()
    }

    /// Copy of the whole identity/signal cache
    pub fn info(&self) -> ModemInfo {
        self.info.snapshot()
    }

    /// Cached registration status for an access technology
    pub fn registration_status(&self, tech: AccessTechnology) -> RegistrationStatus {
        self.info.lock().registration_status(tech)
    }

    /// Stop the actor and wait for it to exit
    pub async fn shutdown(self) {
        if self.cmd_tx.send(ModemCommand::Shutdown).await.is_err() {
            debug!("modem actor already stopped");
        }
        if let Err(e) = self.task.await {
            warn!("modem actor ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::inert_resources;

    #[tokio::test]
    async fn test_shutdown_waits_for_actor() {
        let modem = ModemCellular::spawn(ModemConfig::default(), inert_resources());
        let mut state = modem.subscribe();

        tokio::time::timeout(Duration::from_secs(1), modem.shutdown())
            .await
            .expect("shutdown should complete");
        // The actor owned the only state sender
        assert!(state.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_spawn_confirms_idle_before_returning() {
        let modem = ModemCellular::spawn(ModemConfig::default(), inert_resources());
        assert_eq!(*modem.suspended_rx.borrow(), 1);
        assert_eq!(modem.state(), ModemState::Idle);
        modem.shutdown().await;
    }
}
