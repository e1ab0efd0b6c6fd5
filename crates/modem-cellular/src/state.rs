//! Orchestrator states

use std::fmt;

/// A state of the bring-up/tear-down machine
///
/// `Idle` is both the initial state and the resting state after every
/// completed suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModemState {
    /// Powered down, all collaborators released
    #[default]
    Idle,
    /// Reset line held active
    ResetPulse,
    /// Power line held active to switch the modem on
    PowerOnPulse,
    /// Waiting for the modem to boot
    AwaitPowerOn,
    /// Running the init script on the raw pipe
    RunInitScript,
    /// Bringing up the multiplexer on the pipe
    ConnectMultiplex,
    /// Opening the data channel
    OpenChannel1,
    /// Opening the command channel
    OpenChannel2,
    /// Running the dial script on the data channel
    RunDialScript,
    /// Polling registration over the command channel
    AwaitRegistered,
    /// Registered with the IP link carrier up
    CarrierOn,
    /// Closing the pipe before power-off
    InitPowerOff,
    /// Power line held active to switch the modem off
    PowerOffPulse,
    /// Waiting for the modem to shut down
    AwaitPowerOff,
}

impl ModemState {
    /// Every state, in declaration order
    pub const ALL: [ModemState; 14] = [
        ModemState::Idle,
        ModemState::ResetPulse,
        ModemState::PowerOnPulse,
        ModemState::AwaitPowerOn,
        ModemState::RunInitScript,
        ModemState::ConnectMultiplex,
        ModemState::OpenChannel1,
        ModemState::OpenChannel2,
        ModemState::RunDialScript,
        ModemState::AwaitRegistered,
        ModemState::CarrierOn,
        ModemState::InitPowerOff,
        ModemState::PowerOffPulse,
        ModemState::AwaitPowerOff,
    ];

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ModemState::Idle => "idle",
            ModemState::ResetPulse => "reset pulse",
            ModemState::PowerOnPulse => "power pulse",
            ModemState::AwaitPowerOn => "await power on",
            ModemState::RunInitScript => "run init script",
            ModemState::ConnectMultiplex => "connect cmux",
            ModemState::OpenChannel1 => "open dlci1",
            ModemState::OpenChannel2 => "open dlci2",
            ModemState::RunDialScript => "run dial script",
            ModemState::AwaitRegistered => "await registered",
            ModemState::CarrierOn => "carrier on",
            ModemState::InitPowerOff => "init power off",
            ModemState::PowerOffPulse => "power off pulse",
            ModemState::AwaitPowerOff => "await power off",
        }
    }

    /// Whether synchronous queries may run against the command channel
    pub fn is_steady(&self) -> bool {
        matches!(self, ModemState::AwaitRegistered | ModemState::CarrierOn)
    }

    /// Whether the state belongs to the tear-down chain
    pub fn is_teardown(&self) -> bool {
        matches!(
            self,
            ModemState::InitPowerOff | ModemState::PowerOffPulse | ModemState::AwaitPowerOff
        )
    }
}

impl fmt::Display for ModemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ModemState::default(), ModemState::Idle);
    }

    #[test]
    fn test_steady_states() {
        let steady: Vec<_> = ModemState::ALL.iter().filter(|s| s.is_steady()).collect();
        assert_eq!(steady, vec![&ModemState::AwaitRegistered, &ModemState::CarrierOn]);
    }

    #[test]
    fn test_teardown_states() {
        assert!(ModemState::InitPowerOff.is_teardown());
        assert!(!ModemState::Idle.is_teardown());
        assert!(!ModemState::CarrierOn.is_teardown());
    }
}
