//! Chat script model
//!
//! A chat script is an ordered list of request lines, each paired with the
//! response patterns that must be seen before the next request is sent. A
//! script also carries a set of abort patterns and an overall timeout.
//!
//! Scripts are plain data. Executing them is the job of a chat driver, which
//! reports the outcome as a [`ScriptResult`] and hands the arguments of every
//! response that names a [`MatchHandler`] back to its owner.

use std::fmt;
use std::time::Duration;

/// Identifies the parser applied to the arguments of a matched response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchHandler {
    /// International mobile equipment identity (`AT+CGSN`)
    Imei,
    /// Model identification (`AT+CGMM`)
    ModelId,
    /// Manufacturer identification (`AT+CGMI`)
    Manufacturer,
    /// Firmware revision (`AT+CGMR`)
    FwVersion,
    /// International mobile subscriber identity (`AT+CIMI`)
    Imsi,
    /// SIM card identifier (`AT+CCID`)
    Iccid,
    /// Signal quality report (`+CSQ: <rssi>,<ber>`)
    Csq,
    /// Extended signal quality report (`+CESQ: ...`)
    Cesq,
    /// Network registration report (`+CREG`, `+CGREG`, `+CEREG`)
    Registration,
}

/// A response pattern, optionally split into arguments and parsed
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChatMatch {
    /// Literal prefix that identifies the response line
    pub pattern: String,
    /// Characters that split the remainder of the line into arguments
    #[cfg_attr(feature = "serde", serde(default))]
    pub separators: String,
    /// Parser to run on the split arguments
    #[cfg_attr(feature = "serde", serde(default))]
    pub handler: Option<MatchHandler>,
}

impl ChatMatch {
    /// Match a literal response with no arguments
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            separators: String::new(),
            handler: None,
        }
    }

    /// Match a response and split its arguments on `separators`
    pub fn with_handler(
        pattern: impl Into<String>,
        separators: impl Into<String>,
        handler: MatchHandler,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            separators: separators.into(),
            handler: Some(handler),
        }
    }

    /// Check whether a received line satisfies this match
    pub fn matches(&self, line: &str) -> bool {
        line.starts_with(&self.pattern)
    }

    /// Split a matched line into its argument vector
    ///
    /// The first element is always the pattern itself, mirroring how a chat
    /// engine presents arguments to its callbacks. Returns `None` when the
    /// line does not match.
    pub fn split<'a>(&'a self, line: &'a str) -> Option<Vec<&'a str>> {
        let rest = line.strip_prefix(self.pattern.as_str())?;
        let mut argv = vec![self.pattern.as_str()];
        if self.separators.is_empty() {
            if !rest.is_empty() {
                argv.push(rest);
            }
        } else {
            argv.extend(rest.split(|c| self.separators.contains(c)));
        }
        Some(argv)
    }
}

/// One request line and the responses that complete it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptChat {
    /// Line sent to the modem (without line terminator)
    pub request: String,
    /// Accepted responses; any one of them completes the step. Empty means none is expected.
    #[cfg_attr(feature = "serde", serde(default))]
    pub response_matches: Vec<ChatMatch>,
    /// Delay before continuing when no response is expected, in milliseconds
    #[cfg_attr(feature = "serde", serde(default))]
    pub timeout_ms: u64,
}

impl ScriptChat {
    /// A request answered by a single response
    pub fn cmd_resp(request: impl Into<String>, response: ChatMatch) -> Self {
        Self {
            request: request.into(),
            response_matches: vec![response],
            timeout_ms: 0,
        }
    }

    /// A request answered by any one of several alternative responses
    pub fn cmd_resp_mult(request: impl Into<String>, responses: Vec<ChatMatch>) -> Self {
        Self {
            request: request.into(),
            response_matches: responses,
            timeout_ms: 0,
        }
    }

    /// A request with no expected response, followed by a fixed delay
    pub fn cmd_resp_none(request: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            request: request.into(),
            response_matches: Vec::new(),
            timeout_ms,
        }
    }

    /// Whether the chat waits for a response
    pub fn expects_response(&self) -> bool {
        !self.response_matches.is_empty()
    }
}

/// A named, ordered command script
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChatScript {
    /// Script name used in logs
    pub name: String,
    /// Ordered request/response steps
    pub chats: Vec<ScriptChat>,
    /// Responses that terminate the script with [`ScriptResult::Abort`]
    #[cfg_attr(feature = "serde", serde(default))]
    pub abort_matches: Vec<ChatMatch>,
    /// Overall timeout in seconds
    pub timeout_s: u64,
}

impl ChatScript {
    /// Create a script
    pub fn new(
        name: impl Into<String>,
        chats: Vec<ScriptChat>,
        abort_matches: Vec<ChatMatch>,
        timeout_s: u64,
    ) -> Self {
        Self {
            name: name.into(),
            chats,
            abort_matches,
            timeout_s,
        }
    }

    /// Overall timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }

    /// Check whether a received line hits one of the abort patterns
    pub fn is_abort(&self, line: &str) -> bool {
        self.abort_matches.iter().any(|m| m.matches(line))
    }
}

/// Outcome of a script run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScriptResult {
    /// Every chat completed
    Success,
    /// An abort pattern was received
    Abort,
    /// The overall timeout expired
    Timeout,
}

impl ScriptResult {
    /// Whether the script completed
    pub fn is_success(&self) -> bool {
        matches!(self, ScriptResult::Success)
    }
}

impl fmt::Display for ScriptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptResult::Success => "success",
            ScriptResult::Abort => "abort",
            ScriptResult::Timeout => "timeout",
        };
        f.write_str(name)
    }
}
