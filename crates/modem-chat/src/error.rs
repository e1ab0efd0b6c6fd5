//! Error types for modem response parsing

use thiserror::Error;

/// Errors that can occur while parsing the arguments of a matched response
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The response carried an unexpected number of arguments
    #[error("unexpected argument count: expected {expected}, got {actual}")]
    ArgumentCount {
        expected: &'static str,
        actual: usize,
    },

    /// A numeric field could not be parsed
    #[error("invalid numeric field: {0:?}")]
    InvalidNumber(String),
}
