//! Orchestrator events
//!
//! Every stimulus the state machine reacts to is one of these small,
//! copyable codes. Producers (pipes, the multiplexer, the chat driver, the
//! timeout timer and the power-management surface) only ever post them to
//! the event queue.

use std::fmt;

/// An event consumed by the modem state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModemEvent {
    /// Power management requested bring-up
    Resume,
    /// Power management requested tear-down
    Suspend,
    /// An asynchronous script completed
    ScriptSuccess,
    /// An asynchronous script aborted or timed out
    ScriptFailed,
    /// The multiplexer finished its connect handshake
    MultiplexConnected,
    /// Logical channel 1 (data) opened
    Channel1Opened,
    /// Logical channel 2 (commands) opened
    Channel2Opened,
    /// The timeout timer expired
    Timeout,
    /// Registered on a network, at home or roaming
    Registered,
    /// No longer registered on any access class
    Deregistered,
    /// The physical pipe opened
    BusOpened,
    /// The physical pipe closed
    BusClosed,
}

impl ModemEvent {
    /// Every event, in declaration order
    pub const ALL: [ModemEvent; 12] = [
        ModemEvent::Resume,
        ModemEvent::Suspend,
        ModemEvent::ScriptSuccess,
        ModemEvent::ScriptFailed,
        ModemEvent::MultiplexConnected,
        ModemEvent::Channel1Opened,
        ModemEvent::Channel2Opened,
        ModemEvent::Timeout,
        ModemEvent::Registered,
        ModemEvent::Deregistered,
        ModemEvent::BusOpened,
        ModemEvent::BusClosed,
    ];

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ModemEvent::Resume => "resume",
            ModemEvent::Suspend => "suspend",
            ModemEvent::ScriptSuccess => "script success",
            ModemEvent::ScriptFailed => "script failed",
            ModemEvent::MultiplexConnected => "multiplex connected",
            ModemEvent::Channel1Opened => "channel 1 opened",
            ModemEvent::Channel2Opened => "channel 2 opened",
            ModemEvent::Timeout => "timeout",
            ModemEvent::Registered => "registered",
            ModemEvent::Deregistered => "deregistered",
            ModemEvent::BusOpened => "bus opened",
            ModemEvent::BusClosed => "bus closed",
        }
    }

    /// Whether this event comes from power management
    pub fn is_power_request(&self) -> bool {
        matches!(self, ModemEvent::Resume | ModemEvent::Suspend)
    }
}

impl fmt::Display for ModemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = ModemEvent::ALL.iter().map(|e| e.name()).collect();
        assert_eq!(names.len(), ModemEvent::ALL.len());
    }

    #[test]
    fn test_power_requests() {
        assert!(ModemEvent::Resume.is_power_request());
        assert!(ModemEvent::Suspend.is_power_request());
        assert!(!ModemEvent::Timeout.is_power_request());
    }

    #[test]
    fn test_display() {
        assert_eq!(ModemEvent::BusOpened.to_string(), "bus opened");
    }
}
