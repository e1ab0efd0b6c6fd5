//! Modem configuration
//!
//! [`ModemConfig`] holds everything that can be written to disk: pulse
//! widths, boot and shutdown delays and the three bring-up scripts. Runtime
//! handles (the pipe, multiplexer, chat driver, link and control lines) are
//! supplied separately in [`ModemResources`]. Both are fixed for the life of
//! a modem handle.

use std::sync::Arc;
use std::time::Duration;

use modem_chat::{scripts, ChatScript};
use serde::{Deserialize, Serialize};

use crate::chat::ChatHandle;
use crate::cmux::MuxHandle;
use crate::line::LineHandle;
use crate::link::LinkHandle;
use crate::pipe::PipeHandle;
use crate::queue::DEFAULT_EVENT_QUEUE_CAPACITY;

/// Settle delay before reopening the pipe in multiplexing mode
pub const CMUX_SETTLE: Duration = Duration::from_millis(100);

/// Settle delay before dialing on the data channel
pub const DIAL_SETTLE: Duration = Duration::from_millis(100);

/// Registration re-poll period
pub const PERIODIC_INTERVAL: Duration = Duration::from_millis(8000);

/// Delay between closing the pipe and pulsing power off
pub const POWER_OFF_SETTLE: Duration = Duration::from_millis(2000);

/// Static modem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModemConfig {
    /// Power key pulse width in milliseconds
    #[serde(default = "default_power_pulse_ms")]
    pub power_pulse_ms: u64,
    /// Reset pulse width in milliseconds
    #[serde(default = "default_reset_pulse_ms")]
    pub reset_pulse_ms: u64,
    /// Boot time after power-on in milliseconds
    #[serde(default = "default_startup_time_ms")]
    pub startup_time_ms: u64,
    /// Shutdown time after power-off in milliseconds
    #[serde(default = "default_shutdown_time_ms")]
    pub shutdown_time_ms: u64,
    /// The modem powers itself on; skip the power pulse
    #[serde(default)]
    pub autostarts: bool,
    /// Bound on how long `suspend` waits for idle, in milliseconds
    #[serde(default = "default_suspend_timeout_ms")]
    pub suspend_timeout_ms: u64,
    /// Event queue capacity
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Script run on the raw pipe before multiplexing
    #[serde(default = "scripts::init_script")]
    pub init_script: ChatScript,
    /// Script run on the data channel to start the IP session
    #[serde(default = "default_dial_script")]
    pub dial_script: ChatScript,
    /// Script run on the command channel to poll registration
    #[serde(default = "scripts::periodic_script")]
    pub periodic_script: ChatScript,
}

fn default_power_pulse_ms() -> u64 {
    1500
}

fn default_reset_pulse_ms() -> u64 {
    100
}

fn default_startup_time_ms() -> u64 {
    10_000
}

fn default_shutdown_time_ms() -> u64 {
    5000
}

fn default_suspend_timeout_ms() -> u64 {
    30_000
}

fn default_event_queue_capacity() -> usize {
    DEFAULT_EVENT_QUEUE_CAPACITY
}

fn default_dial_script() -> ChatScript {
    scripts::dial_script(scripts::DEFAULT_APN)
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            power_pulse_ms: default_power_pulse_ms(),
            reset_pulse_ms: default_reset_pulse_ms(),
            startup_time_ms: default_startup_time_ms(),
            shutdown_time_ms: default_shutdown_time_ms(),
            autostarts: false,
            suspend_timeout_ms: default_suspend_timeout_ms(),
            event_queue_capacity: default_event_queue_capacity(),
            init_script: scripts::init_script(),
            dial_script: default_dial_script(),
            periodic_script: scripts::periodic_script(),
        }
    }
}

impl ModemConfig {
    pub fn power_pulse(&self) -> Duration {
        Duration::from_millis(self.power_pulse_ms)
    }

    pub fn reset_pulse(&self) -> Duration {
        Duration::from_millis(self.reset_pulse_ms)
    }

    pub fn startup_time(&self) -> Duration {
        Duration::from_millis(self.startup_time_ms)
    }

    pub fn shutdown_time(&self) -> Duration {
        Duration::from_millis(self.shutdown_time_ms)
    }

    pub fn suspend_timeout(&self) -> Duration {
        Duration::from_millis(self.suspend_timeout_ms)
    }

    /// Replace the dial script with the generic one for `apn`
    pub fn with_apn(mut self, apn: &str) -> Self {
        self.dial_script = scripts::dial_script(apn);
        self
    }
}

/// Runtime collaborators owned by one modem
#[derive(Debug, Clone)]
pub struct ModemResources {
    /// Physical transport
    pub pipe: PipeHandle,
    /// Channel multiplexer
    pub mux: MuxHandle,
    /// Chat driver
    pub chat: ChatHandle,
    /// IP link layer
    pub link: LinkHandle,
    /// Power key line, if wired
    pub power: Option<LineHandle>,
    /// Reset line, if wired
    pub reset: Option<LineHandle>,
}

/// The three bring-up scripts, shared with the chat driver while running
#[derive(Debug, Clone)]
pub(crate) struct Scripts {
    pub init: Arc<ChatScript>,
    pub dial: Arc<ChatScript>,
    pub periodic: Arc<ChatScript>,
}

impl Scripts {
    pub fn from_config(config: &ModemConfig) -> Self {
        Self {
            init: Arc::new(config.init_script.clone()),
            dial: Arc::new(config.dial_script.clone()),
            periodic: Arc::new(config.periodic_script.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModemConfig::default();
        assert_eq!(config.power_pulse(), Duration::from_millis(1500));
        assert_eq!(config.reset_pulse(), Duration::from_millis(100));
        assert_eq!(config.startup_time(), Duration::from_secs(10));
        assert_eq!(config.shutdown_time(), Duration::from_secs(5));
        assert_eq!(config.suspend_timeout(), Duration::from_secs(30));
        assert_eq!(config.event_queue_capacity, 8);
        assert!(!config.autostarts);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: ModemConfig =
            serde_json::from_str(r#"{"autostarts": true, "startup_time_ms": 2000}"#).unwrap();
        assert!(config.autostarts);
        assert_eq!(config.startup_time_ms, 2000);
        assert_eq!(config.power_pulse_ms, 1500);
        assert_eq!(config.init_script, scripts::init_script());
    }

    #[test]
    fn test_with_apn_rebuilds_dial_script() {
        let config = ModemConfig::default().with_apn("m2m.example");
        assert!(config.dial_script.chats[1].request.contains("m2m.example"));
    }
}
