//! Persistent settings

use std::path::PathBuf;

use modem_cellular::ModemConfig;
use modem_chat::scripts;
use modem_sim::SimModemOptions;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Tool settings, stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Serial port the modem is attached to
    #[serde(default)]
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Access point name used by the dial script
    #[serde(default = "default_apn")]
    pub apn: String,
    /// Orchestrator configuration
    #[serde(default)]
    pub modem: ModemConfig,
    /// Wiring of the simulated modem
    #[serde(default)]
    pub simulation: SimModemOptions,
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_apn() -> String {
    scripts::DEFAULT_APN.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            apn: default_apn(),
            modem: ModemConfig::default(),
            simulation: SimModemOptions::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for modemctl
    /// Uses $XDG_CONFIG_HOME/modemctl, falls back to ~/.config/modemctl
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("modemctl"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("modemctl"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from a specific file
    pub fn load_from(path: PathBuf) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse { path, source })
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), SettingsError> {
        let io_error = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_error)
    }

    /// Orchestrator configuration with the dial script rebuilt for the APN
    pub fn modem_config(&self) -> ModemConfig {
        self.modem.clone().with_apn(&self.apn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"port": "/dev/ttyUSB2"}"#).unwrap();
        assert_eq!(settings.port, "/dev/ttyUSB2");
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.apn, "internet");
        assert_eq!(settings.modem, ModemConfig::default());
    }

    #[test]
    fn test_apn_rebuilds_dial_script() {
        let settings = Settings {
            apn: "iot.example".into(),
            ..Settings::default()
        };
        let dial = settings.modem_config().dial_script;
        assert!(dial
            .chats
            .iter()
            .any(|chat| chat.request.contains("\"iot.example\"")));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("modemctl-settings-{}", std::process::id()))
            .join("settings.json");
        let settings = Settings {
            port: "/dev/ttyACM0".into(),
            baud_rate: 921_600,
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(path.clone()).unwrap();
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("modemctl-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load_from(path.clone()),
            Err(SettingsError::Parse { .. })
        ));
        let _ = std::fs::remove_file(path);
    }
}
