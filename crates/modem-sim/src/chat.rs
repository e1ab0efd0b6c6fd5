//! Simulated chat driver
//!
//! [`SimChatDriver`] never exchanges bytes. When a script "runs" it replays
//! the canned responses registered for the script name through the attached
//! [`ChatListener`], exactly as a real driver reports matched lines, then
//! reports the configured outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! let chat = SimChatDriver::new(Completion::Immediate);
//! chat.set_outcome(scripts::DIAL_SCRIPT, ScriptResult::Abort);
//! chat.set_responses(scripts::CSQ_SCRIPT, vec![SimResponse::new(MatchHandler::Csq, ["+CSQ: ", "25", "99"])]);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modem_cellular::{ChatDriver, ChatError, ChatListener, PipeHandle};
use modem_chat::{scripts, ChatScript, MatchHandler, ScriptResult};
use tokio::sync::oneshot;
use tracing::debug;

use crate::completion::Completion;

/// One canned response line, already split into arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimResponse {
    pub handler: MatchHandler,
    pub argv: Vec<String>,
}

impl SimResponse {
    pub fn new<I, S>(handler: MatchHandler, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            handler,
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    fn replay(&self, listener: &ChatListener) {
        let argv: Vec<&str> = self.argv.iter().map(String::as_str).collect();
        listener.on_match(self.handler, &argv);
    }
}

/// Responses a freshly powered simulated modem gives to the built-in scripts
pub fn default_responses() -> HashMap<String, Vec<SimResponse>> {
    let mut responses = HashMap::new();
    responses.insert(
        scripts::INIT_SCRIPT.to_string(),
        vec![
            SimResponse::new(MatchHandler::Imei, ["", "350457790000001"]),
            SimResponse::new(MatchHandler::ModelId, ["", "SIM7600E"]),
            SimResponse::new(MatchHandler::Manufacturer, ["", "modem-sim"]),
            SimResponse::new(MatchHandler::FwVersion, ["", "LE20B04SIM7600"]),
        ],
    );
    responses.insert(
        scripts::PERIODIC_SCRIPT.to_string(),
        vec![SimResponse::new(
            MatchHandler::Registration,
            ["+CEREG: ", "0", "1"],
        )],
    );
    responses.insert(
        scripts::CSQ_SCRIPT.to_string(),
        vec![SimResponse::new(MatchHandler::Csq, ["+CSQ: ", "20", "99"])],
    );
    responses.insert(
        scripts::CESQ_SCRIPT.to_string(),
        vec![SimResponse::new(
            MatchHandler::Cesq,
            ["+CESQ: ", "99", "99", "255", "255", "20", "50"],
        )],
    );
    responses.insert(
        scripts::IMSI_SCRIPT.to_string(),
        vec![SimResponse::new(MatchHandler::Imsi, ["", "001010123456789"])],
    );
    responses.insert(
        scripts::ICCID_SCRIPT.to_string(),
        vec![SimResponse::new(
            MatchHandler::Iccid,
            ["+CCID: ", "89882280000012345678"],
        )],
    );
    responses
}

#[derive(Debug, Default)]
struct ChatState {
    attached: Option<String>,
    listener: Option<ChatListener>,
    running: Option<String>,
    outcomes: HashMap<String, ScriptResult>,
    responses: HashMap<String, Vec<SimResponse>>,
    async_runs: Vec<String>,
    sync_runs: Vec<String>,
    attaches: usize,
    releases: usize,
    violations: usize,
}

impl ChatState {
    fn outcome(&self, script: &str) -> ScriptResult {
        self.outcomes
            .get(script)
            .copied()
            .unwrap_or(ScriptResult::Success)
    }

    fn responses(&self, script: &str) -> Vec<SimResponse> {
        self.responses.get(script).cloned().unwrap_or_default()
    }
}

/// Chat driver that answers scripts from tables
#[derive(Debug)]
pub struct SimChatDriver {
    completion: Completion,
    state: Arc<Mutex<ChatState>>,
}

impl SimChatDriver {
    /// Driver answering with [`default_responses`]; every script succeeds
    pub fn new(completion: Completion) -> Self {
        let state = ChatState {
            responses: default_responses(),
            ..ChatState::default()
        };
        Self {
            completion,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later run of `script` end with `result`
    pub fn set_outcome(&self, script: &str, result: ScriptResult) {
        self.lock().outcomes.insert(script.to_string(), result);
    }

    /// Replace the responses replayed when `script` runs
    pub fn set_responses(&self, script: &str, responses: Vec<SimResponse>) {
        self.lock().responses.insert(script.to_string(), responses);
    }

    /// Finish the pending asynchronous script with `result`
    ///
    /// Canned responses are replayed first. Returns false if nothing was
    /// running.
    pub fn complete_script(&self, result: ScriptResult) -> bool {
        let Some(name) = self.lock().running.clone() else {
            return false;
        };
        Self::finish(&self.state, &name, Some(result));
        true
    }

    fn finish(state: &Mutex<ChatState>, script: &str, result: Option<ScriptResult>) {
        let (listener, responses, result) = {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            // Released or replaced since the run started
            if state.running.as_deref() != Some(script) {
                return;
            }
            state.running = None;
            let result = result.unwrap_or_else(|| state.outcome(script));
            (state.listener.clone(), state.responses(script), result)
        };
        let Some(listener) = listener else {
            return;
        };
        for response in &responses {
            response.replay(&listener);
        }
        listener.script_finished(script, result);
    }

    /// Whether a pipe is attached
    pub fn is_attached(&self) -> bool {
        self.lock().attached.is_some()
    }

    /// Name of the attached pipe
    pub fn attached_pipe(&self) -> Option<String> {
        self.lock().attached.clone()
    }

    /// Name of the asynchronous script still running
    pub fn running(&self) -> Option<String> {
        self.lock().running.clone()
    }

    /// Names of scripts started with `run_script_async`, in order
    pub fn async_runs(&self) -> Vec<String> {
        self.lock().async_runs.clone()
    }

    /// Names of scripts started with `run_script`, in order
    pub fn sync_runs(&self) -> Vec<String> {
        self.lock().sync_runs.clone()
    }

    /// Total script starts of either kind
    pub fn run_count(&self) -> usize {
        let state = self.lock();
        state.async_runs.len() + state.sync_runs.len()
    }

    /// Successful attaches
    pub fn attach_count(&self) -> usize {
        self.lock().attaches
    }

    /// Releases that detached a pipe
    pub fn release_count(&self) -> usize {
        self.lock().releases
    }

    /// Attaches refused because another pipe was still attached
    pub fn violations(&self) -> usize {
        self.lock().violations
    }

    fn check_ready(state: &ChatState) -> Result<(), ChatError> {
        if state.listener.is_none() {
            return Err(ChatError::NotAttached);
        }
        if let Some(running) = &state.running {
            return Err(ChatError::Busy(running.clone()));
        }
        Ok(())
    }
}

impl ChatDriver for SimChatDriver {
    fn attach(&self, pipe: PipeHandle, listener: ChatListener) -> Result<(), ChatError> {
        let mut state = self.lock();
        if let Some(current) = &state.attached {
            let current = current.clone();
            state.violations += 1;
            return Err(ChatError::AlreadyAttached(current));
        }
        debug!("sim chat attached to {}", pipe.name());
        state.attached = Some(pipe.name().to_string());
        state.listener = Some(listener);
        state.attaches += 1;
        Ok(())
    }

    fn release(&self) {
        let mut state = self.lock();
        if state.attached.take().is_some() {
            state.releases += 1;
        }
        state.listener = None;
        state.running = None;
    }

    fn run_script_async(&self, script: Arc<ChatScript>) -> Result<(), ChatError> {
        {
            let mut state = self.lock();
            Self::check_ready(&state)?;
            state.async_runs.push(script.name.clone());
            state.running = Some(script.name.clone());
        }
        debug!("sim chat running {}", script.name);

        let state = Arc::clone(&self.state);
        self.completion
            .schedule(move || SimChatDriver::finish(&state, &script.name, None));
        Ok(())
    }

    /// Synchronous runs complete on their own even under manual completion
    fn run_script(
        &self,
        script: Arc<ChatScript>,
    ) -> Result<oneshot::Receiver<ScriptResult>, ChatError> {
        let (listener, responses, result) = {
            let mut state = self.lock();
            Self::check_ready(&state)?;
            state.sync_runs.push(script.name.clone());
            (
                state.listener.clone(),
                state.responses(&script.name),
                state.outcome(&script.name),
            )
        };

        let (tx, rx) = oneshot::channel();
        let reply = move || {
            if let Some(listener) = listener {
                for response in &responses {
                    response.replay(&listener);
                }
            }
            let _ = tx.send(result);
        };
        match self.completion {
            Completion::Delayed(_) => self.completion.schedule(reply),
            Completion::Immediate | Completion::Manual => reply(),
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::SimPipe;
    use modem_cellular::{EventQueue, ModemEvent, SharedInfo};

    fn attached(completion: Completion) -> (SimChatDriver, EventQueue, SharedInfo) {
        let queue = EventQueue::default();
        let info = SharedInfo::default();
        let chat = SimChatDriver::new(completion);
        let pipe: PipeHandle = Arc::new(SimPipe::new("dlci2", Completion::Immediate));
        chat.attach(pipe, ChatListener::new(queue.sender(), info.clone()))
            .unwrap();
        (chat, queue, info)
    }

    #[test]
    fn test_init_script_fills_identity() {
        let (chat, queue, info) = attached(Completion::Immediate);
        chat.run_script_async(Arc::new(scripts::init_script()))
            .unwrap();

        assert_eq!(queue.drain(), vec![ModemEvent::ScriptSuccess]);
        let info = info.snapshot();
        assert_eq!(info.imei, "350457790000001");
        assert_eq!(info.manufacturer, "modem-sim");
        assert!(chat.running().is_none());
    }

    #[test]
    fn test_periodic_script_reports_registration_first() {
        let (chat, queue, _) = attached(Completion::Immediate);
        chat.run_script_async(Arc::new(scripts::periodic_script()))
            .unwrap();
        assert_eq!(
            queue.drain(),
            vec![ModemEvent::Registered, ModemEvent::ScriptSuccess]
        );
    }

    #[test]
    fn test_configured_failure() {
        let (chat, queue, _) = attached(Completion::Immediate);
        chat.set_outcome(scripts::DIAL_SCRIPT, ScriptResult::Abort);
        chat.run_script_async(Arc::new(scripts::dial_script("internet")))
            .unwrap();
        assert_eq!(queue.drain(), vec![ModemEvent::ScriptFailed]);
    }

    #[test]
    fn test_attach_while_attached_is_a_violation() {
        let (chat, queue, info) = attached(Completion::Immediate);
        let other: PipeHandle = Arc::new(SimPipe::new("dlci1", Completion::Immediate));
        let err = chat
            .attach(other, ChatListener::new(queue.sender(), info))
            .unwrap_err();
        assert_eq!(err, ChatError::AlreadyAttached("dlci2".into()));
        assert_eq!(chat.violations(), 1);
        assert_eq!(chat.attached_pipe().as_deref(), Some("dlci2"));
    }

    #[test]
    fn test_unattached_run_is_refused() {
        let chat = SimChatDriver::new(Completion::Immediate);
        let err = chat
            .run_script_async(Arc::new(scripts::csq_script()))
            .unwrap_err();
        assert_eq!(err, ChatError::NotAttached);
        assert_eq!(chat.run_count(), 0);
    }

    #[test]
    fn test_manual_completion_and_busy() {
        let (chat, queue, _) = attached(Completion::Manual);
        chat.run_script_async(Arc::new(scripts::periodic_script()))
            .unwrap();
        assert!(queue.is_empty());

        let err = chat
            .run_script_async(Arc::new(scripts::periodic_script()))
            .unwrap_err();
        assert_eq!(err, ChatError::Busy("periodic".into()));

        assert!(chat.complete_script(ScriptResult::Timeout));
        assert_eq!(
            queue.drain(),
            vec![ModemEvent::Registered, ModemEvent::ScriptFailed]
        );
        assert!(!chat.complete_script(ScriptResult::Success));
    }

    #[test]
    fn test_release_discards_pending_script() {
        let (chat, queue, _) = attached(Completion::Manual);
        chat.run_script_async(Arc::new(scripts::periodic_script()))
            .unwrap();
        chat.release();
        assert!(!chat.complete_script(ScriptResult::Success));
        assert!(queue.is_empty());
        assert_eq!(chat.release_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_run_replies_without_events() {
        let (chat, queue, info) = attached(Completion::Immediate);
        let reply = chat.run_script(Arc::new(scripts::csq_script())).unwrap();

        assert_eq!(reply.await.unwrap(), ScriptResult::Success);
        assert!(queue.is_empty());
        assert_eq!(info.snapshot().rssi, 20);
        assert_eq!(chat.sync_runs(), vec!["csq".to_string()]);
    }
}
