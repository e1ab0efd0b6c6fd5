//! Network registration vocabulary

use std::fmt;

/// Registration state reported by `+CREG`, `+CGREG` and `+CEREG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistrationStatus {
    /// Not registered and not searching
    #[default]
    NotRegistered,
    /// Registered on the home network
    RegisteredHome,
    /// Not registered, searching for an operator
    Searching,
    /// Registration denied
    Denied,
    /// Status unknown (also used for codes outside the standard range)
    Unknown,
    /// Registered while roaming
    RegisteredRoaming,
}

impl RegistrationStatus {
    /// Decode the numeric `<stat>` field
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => RegistrationStatus::NotRegistered,
            1 => RegistrationStatus::RegisteredHome,
            2 => RegistrationStatus::Searching,
            3 => RegistrationStatus::Denied,
            5 => RegistrationStatus::RegisteredRoaming,
            _ => RegistrationStatus::Unknown,
        }
    }

    /// Numeric `<stat>` value
    pub fn code(&self) -> u8 {
        match self {
            RegistrationStatus::NotRegistered => 0,
            RegistrationStatus::RegisteredHome => 1,
            RegistrationStatus::Searching => 2,
            RegistrationStatus::Denied => 3,
            RegistrationStatus::Unknown => 4,
            RegistrationStatus::RegisteredRoaming => 5,
        }
    }

    /// Whether the modem is attached to a network, at home or roaming
    pub fn is_registered(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::RegisteredHome | RegistrationStatus::RegisteredRoaming
        )
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationStatus::NotRegistered => "not registered",
            RegistrationStatus::RegisteredHome => "registered (home)",
            RegistrationStatus::Searching => "searching",
            RegistrationStatus::Denied => "denied",
            RegistrationStatus::Unknown => "unknown",
            RegistrationStatus::RegisteredRoaming => "registered (roaming)",
        };
        f.write_str(name)
    }
}

/// Which registration report a status came from
///
/// Each report tracks one access class: circuit switched (`+CREG`), packet
/// switched GPRS/UMTS (`+CGREG`) and EPS/LTE (`+CEREG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistrationSource {
    /// `+CREG`
    Creg,
    /// `+CGREG`
    Cgreg,
    /// `+CEREG`
    Cereg,
}

impl RegistrationSource {
    /// Classify a report by its match token
    ///
    /// Anything that is not a `+CREG` or `+CGREG` report counts as EPS.
    pub fn from_token(token: &str) -> Self {
        match token {
            "+CREG: " => RegistrationSource::Creg,
            "+CGREG: " => RegistrationSource::Cgreg,
            _ => RegistrationSource::Cereg,
        }
    }
}

/// Radio access technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessTechnology {
    Gsm,
    Gprs,
    Umts,
    Edge,
    Lte,
    LteCatM1,
    LteCatM2,
    NbIot,
}

impl AccessTechnology {
    /// The registration report that tracks this technology
    pub fn registration_source(&self) -> RegistrationSource {
        match self {
            AccessTechnology::Gsm => RegistrationSource::Creg,
            AccessTechnology::Gprs | AccessTechnology::Umts | AccessTechnology::Edge => {
                RegistrationSource::Cgreg
            }
            AccessTechnology::Lte
            | AccessTechnology::LteCatM1
            | AccessTechnology::LteCatM2
            | AccessTechnology::NbIot => RegistrationSource::Cereg,
        }
    }
}
