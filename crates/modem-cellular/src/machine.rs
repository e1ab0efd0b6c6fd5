//! Bring-up/tear-down state machine
//!
//! The machine is the only consumer of the event queue and the only place
//! where the modem state changes. Each state has an enter hook, a leave hook
//! and an event handler. A handler returns the next state, if any, and the
//! machine performs the transition as leave, assign, enter:
//!
//! - A failing leave hook is logged and aborts the transition; the state is
//!   left unchanged and nothing retries automatically.
//! - A failing enter hook is logged; the new state stands.
//!
//! # Bring-up
//!
//! ```text
//! Idle -> [PowerOnPulse | ResetPulse] -> AwaitPowerOn -> RunInitScript
//!      -> ConnectMultiplex -> OpenChannel1 -> OpenChannel2 -> RunDialScript
//!      -> AwaitRegistered -> CarrierOn
//! ```
//!
//! # Tear-down
//!
//! `Suspend` sends the early power-up states straight back to `Idle` and
//! every multiplexed state to `InitPowerOff`, which continues through the
//! optional `PowerOffPulse` and `AwaitPowerOff` to `Idle`.

use std::sync::Arc;

use modem_chat::ChatScript;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::chat::ChatListener;
use crate::cmux::{Dlci, MuxListener};
use crate::config::{
    ModemConfig, ModemResources, Scripts, CMUX_SETTLE, DIAL_SETTLE, PERIODIC_INTERVAL,
    POWER_OFF_SETTLE,
};
use crate::error::{LineError, ModemError};
use crate::events::ModemEvent;
use crate::info::SharedInfo;
use crate::line::LineHandle;
use crate::pipe::{PipeHandle, PipeListener};
use crate::queue::{EventQueue, EventSender};
use crate::state::ModemState;
use crate::timer::TimeoutTimer;

/// The orchestrator state machine
#[derive(Debug)]
pub struct ModemStateMachine {
    state: ModemState,
    config: ModemConfig,
    scripts: Scripts,
    resources: ModemResources,
    timer: TimeoutTimer,
    events: EventSender,
    info: SharedInfo,
    state_tx: watch::Sender<ModemState>,
    suspended_tx: watch::Sender<u64>,
}

impl ModemStateMachine {
    /// Create a machine in `Idle`
    ///
    /// The idle enter hook has not run yet; call [`start`](Self::start)
    /// before handing the machine to the dispatcher.
    pub fn new(
        config: ModemConfig,
        resources: ModemResources,
        events: EventSender,
        info: SharedInfo,
    ) -> Self {
        let (state_tx, _) = watch::channel(ModemState::Idle);
        let (suspended_tx, _) = watch::channel(0);
        Self {
            state: ModemState::Idle,
            scripts: Scripts::from_config(&config),
            config,
            resources,
            timer: TimeoutTimer::new(events.clone()),
            events,
            info,
            state_tx,
            suspended_tx,
        }
    }

    /// Run the idle enter hook, leaving the modem powered down
    pub fn start(&mut self) {
        if let Err(e) = self.on_enter(ModemState::Idle) {
            warn!("failed to enter state {}: {}", ModemState::Idle, e);
        }
    }

    /// Current state
    pub fn state(&self) -> ModemState {
        self.state
    }

    /// Configuration the machine was built with
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// The timeout timer
    pub fn timer(&self) -> &TimeoutTimer {
        &self.timer
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ModemState> {
        self.state_tx.subscribe()
    }

    /// Watch the suspend generation
    ///
    /// The counter goes up each time `Idle` is entered or a `Suspend` is
    /// re-confirmed in `Idle`. A waiter that read the generation before posting
    /// `Suspend` is done once it sees a larger value.
    pub fn subscribe_suspended(&self) -> watch::Receiver<u64> {
        self.suspended_tx.subscribe()
    }

    /// Post the pending timeout, if the timer is armed
    pub fn expire_timer(&mut self) -> bool {
        self.timer.fire()
    }

    /// Handle queued events, oldest first, until the queue is empty
    ///
    /// Returns the number of events handled.
    pub fn dispatch(&mut self, queue: &EventQueue) -> usize {
        let mut handled = 0;
        while let Some(event) = queue.pop() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Handle one event in the current state
    pub fn handle_event(&mut self, event: ModemEvent) {
        let previous = self.state;
        debug!("event {}", event);

        if let Some(next) = self.on_event(event) {
            self.enter_state(next);
        }

        if self.state != previous {
            debug!("switch from {} to {}", previous, self.state);
        }
    }

    fn enter_state(&mut self, next: ModemState) {
        if let Err(e) = self.on_leave(self.state) {
            warn!("failed to leave state {}: {}", self.state, e);
            return;
        }

        self.state = next;
        self.state_tx.send_replace(next);

        if let Err(e) = self.on_enter(next) {
            warn!("failed to enter state {}: {}", next, e);
        }
    }

    fn on_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match self.state {
            ModemState::Idle => self.idle_event(event),
            ModemState::ResetPulse | ModemState::PowerOnPulse | ModemState::AwaitPowerOn => {
                self.power_on_event(event)
            }
            ModemState::RunInitScript => self.run_init_script_event(event),
            ModemState::ConnectMultiplex => self.connect_multiplex_event(event),
            ModemState::OpenChannel1 => self.open_channel_event(event, Dlci::Data),
            ModemState::OpenChannel2 => self.open_channel_event(event, Dlci::Command),
            ModemState::RunDialScript => self.run_dial_script_event(event),
            ModemState::AwaitRegistered => self.await_registered_event(event),
            ModemState::CarrierOn => self.carrier_on_event(event),
            ModemState::InitPowerOff => self.init_power_off_event(event),
            ModemState::PowerOffPulse => self.power_off_pulse_event(event),
            ModemState::AwaitPowerOff => self.await_power_off_event(event),
        }
    }

    fn on_enter(&mut self, state: ModemState) -> Result<(), ModemError> {
        match state {
            ModemState::Idle => self.idle_enter(),
            ModemState::ResetPulse => {
                self.timer.start(self.config.reset_pulse());
                self.reset_line()?.set_active(true)?;
                Ok(())
            }
            ModemState::PowerOnPulse | ModemState::PowerOffPulse => {
                self.timer.start(self.config.power_pulse());
                self.power_line()?.set_active(true)?;
                Ok(())
            }
            ModemState::AwaitPowerOn => {
                self.timer.start(self.config.startup_time());
                Ok(())
            }
            ModemState::RunInitScript => {
                self.attach_bus();
                self.resources.pipe.open_async()?;
                Ok(())
            }
            ModemState::ConnectMultiplex => {
                self.timer.start(CMUX_SETTLE);
                Ok(())
            }
            ModemState::OpenChannel1 => self.open_channel_enter(Dlci::Data),
            ModemState::OpenChannel2 => self.open_channel_enter(Dlci::Command),
            ModemState::RunDialScript => {
                self.timer.start(DIAL_SETTLE);
                Ok(())
            }
            ModemState::AwaitRegistered => {
                let data = self.resources.mux.channel(Dlci::Data);
                self.resources.link.attach(data)?;
                self.timer.start(PERIODIC_INTERVAL);
                let command = self.resources.mux.channel(Dlci::Command);
                self.resources.chat.attach(command, self.chat_listener())?;
                Ok(())
            }
            ModemState::CarrierOn => {
                self.resources.link.carrier_on();
                self.timer.start(PERIODIC_INTERVAL);
                info!("modem carrier on");
                Ok(())
            }
            ModemState::InitPowerOff => {
                self.timer.start(POWER_OFF_SETTLE);
                self.resources.pipe.close_async()?;
                Ok(())
            }
            ModemState::AwaitPowerOff => {
                self.timer.start(self.config.shutdown_time());
                Ok(())
            }
        }
    }

    fn on_leave(&mut self, state: ModemState) -> Result<(), ModemError> {
        match state {
            ModemState::Idle => {
                if let Some(reset) = &self.resources.reset {
                    reset.set_active(false)?;
                }
                Ok(())
            }
            ModemState::ResetPulse => {
                self.timer.stop();
                self.reset_line()?.set_active(false)?;
                Ok(())
            }
            ModemState::PowerOnPulse | ModemState::PowerOffPulse => {
                self.timer.stop();
                self.power_line()?.set_active(false)?;
                Ok(())
            }
            ModemState::RunInitScript => {
                self.resources.chat.release();
                Ok(())
            }
            ModemState::OpenChannel1 => {
                self.resources.mux.channel(Dlci::Data).release();
                Ok(())
            }
            ModemState::OpenChannel2 => {
                self.resources.mux.channel(Dlci::Command).release();
                Ok(())
            }
            ModemState::RunDialScript => {
                self.timer.stop();
                self.resources.chat.release();
                Ok(())
            }
            ModemState::CarrierOn => {
                self.timer.stop();
                self.resources.link.carrier_off();
                self.resources.chat.release();
                self.resources.link.release();
                Ok(())
            }
            ModemState::InitPowerOff => {
                self.timer.stop();
                self.resources.chat.release();
                self.resources.link.release();
                Ok(())
            }
            ModemState::AwaitPowerOn
            | ModemState::ConnectMultiplex
            | ModemState::AwaitRegistered
            | ModemState::AwaitPowerOff => {
                self.timer.stop();
                Ok(())
            }
        }
    }

    // ========================================================================
    // Per-state handlers
    // ========================================================================

    fn idle_enter(&mut self) -> Result<(), ModemError> {
        self.timer.stop();
        self.resources.chat.release();
        self.resources.link.release();
        self.resources.mux.release();
        if let Err(e) = self.resources.pipe.close_async() {
            debug!("pipe {} not closed: {}", self.resources.pipe.name(), e);
        }
        self.confirm_suspended();
        info!("modem idle");

        if let Some(reset) = &self.resources.reset {
            reset.set_active(true)?;
        }
        Ok(())
    }

    fn idle_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Resume => {
                let next = if self.config.autostarts {
                    ModemState::AwaitPowerOn
                } else if self.resources.power.is_some() {
                    ModemState::PowerOnPulse
                } else if self.resources.reset.is_some() {
                    ModemState::AwaitPowerOn
                } else {
                    ModemState::RunInitScript
                };
                Some(next)
            }
            ModemEvent::Suspend => {
                self.confirm_suspended();
                None
            }
            _ => None,
        }
    }

    /// Shared by `ResetPulse`, `PowerOnPulse` and `AwaitPowerOn`
    fn power_on_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Timeout if self.state == ModemState::AwaitPowerOn => {
                Some(ModemState::RunInitScript)
            }
            ModemEvent::Timeout => Some(ModemState::AwaitPowerOn),
            ModemEvent::Suspend => Some(ModemState::Idle),
            _ => None,
        }
    }

    fn run_init_script_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::BusOpened => {
                let script = Arc::clone(&self.scripts.init);
                self.start_script(self.resources.pipe.clone(), script);
                None
            }
            ModemEvent::ScriptSuccess => {
                let addr = self.info.lock().link_addr();
                if let Err(e) = self.resources.link.set_link_addr(&addr) {
                    warn!("failed to set link address: {}", e);
                }
                self.resources.chat.release();
                // The chat driver owned the pipe callbacks while attached
                self.attach_bus();
                self.close_bus();
                None
            }
            ModemEvent::BusClosed => Some(ModemState::ConnectMultiplex),
            ModemEvent::Suspend => Some(ModemState::Idle),
            ModemEvent::ScriptFailed => {
                self.close_bus();
                let next = if self.resources.power.is_some() {
                    ModemState::PowerOnPulse
                } else if self.resources.reset.is_some() {
                    ModemState::ResetPulse
                } else {
                    ModemState::Idle
                };
                Some(next)
            }
            _ => None,
        }
    }

    fn connect_multiplex_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Timeout => {
                self.attach_bus();
                if let Err(e) = self.resources.pipe.open_async() {
                    warn!("failed to reopen pipe: {}", e);
                }
                None
            }
            ModemEvent::BusOpened => {
                let connected = self
                    .resources
                    .mux
                    .attach(self.resources.pipe.clone())
                    .and_then(|_| {
                        self.resources
                            .mux
                            .connect_async(MuxListener::new(self.events.clone()))
                    });
                if let Err(e) = connected {
                    warn!("failed to connect multiplexer: {}", e);
                }
                None
            }
            ModemEvent::MultiplexConnected => Some(ModemState::OpenChannel1),
            ModemEvent::Suspend => Some(ModemState::InitPowerOff),
            _ => None,
        }
    }

    fn open_channel_enter(&mut self, dlci: Dlci) -> Result<(), ModemError> {
        let channel = self.resources.mux.channel(dlci);
        channel.attach(PipeListener::channel(
            self.events.clone(),
            dlci.opened_event(),
        ));
        channel.open_async()?;
        Ok(())
    }

    fn open_channel_event(&mut self, event: ModemEvent, dlci: Dlci) -> Option<ModemState> {
        match (event, dlci) {
            (ModemEvent::Channel1Opened, Dlci::Data) => Some(ModemState::OpenChannel2),
            (ModemEvent::Channel2Opened, Dlci::Command) => Some(ModemState::RunDialScript),
            (ModemEvent::Suspend, _) => Some(ModemState::InitPowerOff),
            _ => None,
        }
    }

    fn run_dial_script_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Timeout => {
                let data = self.resources.mux.channel(Dlci::Data);
                let script = Arc::clone(&self.scripts.dial);
                self.start_script(data, script);
                None
            }
            ModemEvent::ScriptSuccess => Some(ModemState::AwaitRegistered),
            ModemEvent::ScriptFailed => {
                // Let the channel settle again and redial
                self.resources.chat.release();
                self.timer.start(DIAL_SETTLE);
                None
            }
            ModemEvent::Suspend => Some(ModemState::InitPowerOff),
            _ => None,
        }
    }

    fn await_registered_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::ScriptSuccess | ModemEvent::ScriptFailed => {
                self.timer.start(PERIODIC_INTERVAL);
                None
            }
            ModemEvent::Timeout => {
                self.run_periodic_script();
                None
            }
            ModemEvent::Registered => Some(ModemState::CarrierOn),
            ModemEvent::Suspend => Some(ModemState::InitPowerOff),
            _ => None,
        }
    }

    fn carrier_on_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::ScriptSuccess | ModemEvent::ScriptFailed => {
                self.timer.start(PERIODIC_INTERVAL);
                None
            }
            ModemEvent::Timeout => {
                self.run_periodic_script();
                None
            }
            ModemEvent::Deregistered => Some(ModemState::RunDialScript),
            ModemEvent::Suspend => Some(ModemState::InitPowerOff),
            _ => None,
        }
    }

    fn init_power_off_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Timeout if self.resources.power.is_some() => {
                Some(ModemState::PowerOffPulse)
            }
            ModemEvent::Timeout => Some(ModemState::Idle),
            _ => None,
        }
    }

    fn power_off_pulse_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Timeout => Some(ModemState::AwaitPowerOff),
            _ => None,
        }
    }

    fn await_power_off_event(&mut self, event: ModemEvent) -> Option<ModemState> {
        match event {
            ModemEvent::Timeout => Some(ModemState::Idle),
            _ => None,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn confirm_suspended(&self) {
        self.suspended_tx.send_modify(|generation| *generation += 1);
    }

    fn chat_listener(&self) -> ChatListener {
        ChatListener::new(self.events.clone(), self.info.clone())
    }

    fn attach_bus(&self) {
        self.resources
            .pipe
            .attach(PipeListener::bus(self.events.clone()));
    }

    fn close_bus(&self) {
        if let Err(e) = self.resources.pipe.close_async() {
            warn!("failed to close pipe {}: {}", self.resources.pipe.name(), e);
        }
    }

    /// Attach the chat driver to `pipe` and start `script`
    ///
    /// A script that cannot be started is reported as failed so the state's
    /// failure path runs.
    fn start_script(&self, pipe: PipeHandle, script: Arc<ChatScript>) {
        let name = script.name.clone();
        let started = self
            .resources
            .chat
            .attach(pipe, self.chat_listener())
            .and_then(|_| self.resources.chat.run_script_async(script));
        if let Err(e) = started {
            warn!("failed to start {} script: {}", name, e);
            self.events.post(ModemEvent::ScriptFailed);
        }
    }

    fn run_periodic_script(&mut self) {
        let script = Arc::clone(&self.scripts.periodic);
        if let Err(e) = self.resources.chat.run_script_async(script) {
            debug!("periodic script not started: {}", e);
            self.timer.start(PERIODIC_INTERVAL);
        }
    }

    fn power_line(&self) -> Result<LineHandle, LineError> {
        self.resources
            .power
            .clone()
            .ok_or(LineError::Missing("power"))
    }

    fn reset_line(&self) -> Result<LineHandle, LineError> {
        self.resources
            .reset
            .clone()
            .ok_or(LineError::Missing("reset"))
    }
}
