//! Error types for the command line tool

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings file failed
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for this version
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors that can occur while probing a port
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    Enumeration(#[from] serialport::Error),

    /// Transport failure
    #[error(transparent)]
    Pipe(#[from] modem_cellular::PipeError),

    /// Nothing answered `AT`
    #[error("no modem answered on {0}")]
    NoAnswer(String),
}
