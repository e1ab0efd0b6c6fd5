//! Modem probing over a serial port
//!
//! The prober wakes the modem with `AT`, then runs the identity and signal
//! scripts line by line over a [`SerialPipe`] and collects every parsed
//! response into a [`ModemInfo`]. It never switches the modem into
//! multiplexing mode.

use std::time::Duration;

use modem_cellular::{ModemInfo, SerialPipe};
use modem_chat::{scripts, ChatResponse, ChatScript, ScriptChat, ScriptResult};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace, warn};

use crate::error::ProbeError;

/// Configuration for probing
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for each wake-up attempt
    pub wake_timeout: Duration,
    /// Number of `AT` attempts before giving up
    pub wake_attempts: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            wake_timeout: Duration::from_millis(500),
            wake_attempts: 3,
        }
    }
}

/// Result of probing a port
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub port: String,
    pub info: ModemInfo,
    /// Scripts that did not complete, with their outcome
    pub failed: Vec<(String, ScriptResult)>,
}

/// Splits received bytes into trimmed, non-empty lines
#[derive(Debug, Default)]
struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.push_str(&String::from_utf8_lossy(bytes));
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self.pending.find(['\r', '\n'])?;
            let line = self.pending[..end].trim().to_string();
            self.pending.drain(..=end);
            if !line.is_empty() {
                return Some(line);
            }
        }
    }
}

/// What a received line means to the current chat
#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    /// An abort pattern
    Abort,
    /// A response that completes the chat, with its parsed value if any
    Matched(Option<ChatResponse>),
    /// Echo, unsolicited report or noise
    Ignored,
}

fn classify(script: &ChatScript, chat: &ScriptChat, line: &str) -> LineOutcome {
    if script.is_abort(line) {
        return LineOutcome::Abort;
    }
    let Some(found) = chat.response_matches.iter().find(|m| m.matches(line)) else {
        return LineOutcome::Ignored;
    };
    let response = match (found.handler, found.split(line)) {
        (Some(handler), Some(argv)) => match ChatResponse::parse(handler, &argv) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("ignoring response {:?}: {}", line, e);
                None
            }
        },
        _ => None,
    };
    LineOutcome::Matched(response)
}

/// Runs chat scripts directly over a serial pipe
pub struct LineChat<'a> {
    pipe: &'a SerialPipe,
    lines: LineBuffer,
}

impl<'a> LineChat<'a> {
    pub fn new(pipe: &'a SerialPipe) -> Self {
        Self {
            pipe,
            lines: LineBuffer::default(),
        }
    }

    async fn send(&self, request: &str) -> Result<(), ProbeError> {
        trace!("> {}", request);
        self.pipe.transmit(format!("{}\r", request).as_bytes()).await?;
        Ok(())
    }

    /// Next line, or `None` once `deadline` passes
    async fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, ProbeError> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(line) = self.lines.next_line() {
                trace!("< {}", line);
                return Ok(Some(line));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let n = self.pipe.receive(&mut buf, deadline - now).await?;
            self.lines.push(&buf[..n]);
        }
    }

    /// Send `AT` until the modem answers `OK`
    pub async fn wake(&mut self, config: &ProbeConfig) -> Result<bool, ProbeError> {
        for attempt in 1..=config.wake_attempts {
            debug!("wake attempt {}", attempt);
            self.send("AT").await?;
            let deadline = Instant::now() + config.wake_timeout;
            while let Some(line) = self.read_line(deadline).await? {
                if line == "OK" {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Run `script`, returning its outcome and every parsed response
    pub async fn run(
        &mut self,
        script: &ChatScript,
    ) -> Result<(ScriptResult, Vec<ChatResponse>), ProbeError> {
        let deadline = Instant::now() + script.timeout();
        let mut responses = Vec::new();

        for chat in &script.chats {
            if !chat.request.is_empty() {
                self.send(&chat.request).await?;
            }
            if !chat.expects_response() {
                sleep(Duration::from_millis(chat.timeout_ms)).await;
                continue;
            }

            loop {
                let Some(line) = self.read_line(deadline).await? else {
                    return Ok((ScriptResult::Timeout, responses));
                };
                match classify(script, chat, &line) {
                    LineOutcome::Abort => return Ok((ScriptResult::Abort, responses)),
                    LineOutcome::Matched(response) => {
                        responses.extend(response);
                        break;
                    }
                    LineOutcome::Ignored => {}
                }
            }
        }
        Ok((ScriptResult::Success, responses))
    }
}

/// Identity part of the init script, without radio or multiplexer changes
fn identity_script() -> ChatScript {
    let mut script = scripts::init_script();
    script.name = "identify".into();
    script
        .chats
        .retain(|chat| !chat.request.starts_with("AT+CFUN") && !chat.request.starts_with("AT+CMUX"));
    script
}

/// Probe `port` for a modem and read its identity and signal figures
pub async fn probe(port: &str, baud_rate: u32, config: &ProbeConfig) -> Result<ProbeResult, ProbeError> {
    let pipe = SerialPipe::new(port, baud_rate);
    pipe.open().await?;

    let result = probe_open(&pipe, config).await;
    pipe.close().await;
    result
}

async fn probe_open(pipe: &SerialPipe, config: &ProbeConfig) -> Result<ProbeResult, ProbeError> {
    let mut chat = LineChat::new(pipe);
    if !chat.wake(config).await? {
        return Err(ProbeError::NoAnswer(pipe.port().to_string()));
    }
    info!("modem answered on {}", pipe.port());

    let mut info = ModemInfo::default();
    let mut failed = Vec::new();
    for script in [
        identity_script(),
        scripts::imsi_script(),
        scripts::iccid_script(),
        scripts::csq_script(),
        scripts::cesq_script(),
    ] {
        let (result, responses) = chat.run(&script).await?;
        for response in &responses {
            info.apply(response);
        }
        if !result.is_success() {
            warn!("script {} ended with {}", script.name, result);
            failed.push((script.name.clone(), result));
        }
    }

    Ok(ProbeResult {
        port: pipe.port().to_string(),
        info,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modem_chat::ChatMatch;

    #[test]
    fn test_line_buffer_splits_on_any_terminator() {
        let mut lines = LineBuffer::default();
        lines.push(b"\r\n+CSQ: 20,99\r\n\r\nO");
        assert_eq!(lines.next_line().as_deref(), Some("+CSQ: 20,99"));
        assert_eq!(lines.next_line(), None);

        lines.push(b"K\r\n");
        assert_eq!(lines.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_classify_parses_handler_lines() {
        let script = scripts::csq_script();
        let chat = &script.chats[0];

        assert_eq!(
            classify(&script, chat, "+CSQ: 18,99"),
            LineOutcome::Matched(Some(ChatResponse::Csq { rssi: 18 }))
        );
        assert_eq!(classify(&script, chat, "AT+CSQ"), LineOutcome::Ignored);
        assert_eq!(classify(&script, chat, "ERROR"), LineOutcome::Abort);
    }

    #[test]
    fn test_classify_plain_match() {
        let script = ChatScript::new(
            "t",
            vec![ScriptChat::cmd_resp("AT", ChatMatch::new("OK"))],
            scripts::abort_matches(),
            1,
        );
        assert_eq!(
            classify(&script, &script.chats[0], "OK"),
            LineOutcome::Matched(None)
        );
    }

    #[test]
    fn test_identity_script_leaves_radio_alone() {
        let script = identity_script();
        assert!(script
            .chats
            .iter()
            .all(|c| !c.request.starts_with("AT+CMUX") && !c.request.starts_with("AT+CFUN")));
        assert!(script.chats.iter().any(|c| c.request == "AT+CGSN"));
    }

    #[tokio::test]
    async fn test_probe_missing_port_fails() {
        let err = probe("/dev/modemctl-probe-no-such-port", 115_200, &ProbeConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Pipe(_)));
    }
}
