//! Generic 3GPP scripts
//!
//! These scripts only use commands from 3GPP TS 27.007/27.010 and work on
//! most modems that speak CMUX and PPP. Vendor-specific sequences can be
//! supplied in their place through configuration.

use crate::script::{ChatMatch, ChatScript, MatchHandler, ScriptChat};

/// Name of the generic bring-up script
pub const INIT_SCRIPT: &str = "init";
/// Name of the generic dial script
pub const DIAL_SCRIPT: &str = "dial";
/// Name of the generic registration poll script
pub const PERIODIC_SCRIPT: &str = "periodic";
/// Name of the signal quality query
pub const CSQ_SCRIPT: &str = "csq";
/// Name of the extended signal quality query
pub const CESQ_SCRIPT: &str = "cesq";
/// Name of the subscriber identity query
pub const IMSI_SCRIPT: &str = "imsi";
/// Name of the SIM identifier query
pub const ICCID_SCRIPT: &str = "iccid";

/// APN used by the default dial script
pub const DEFAULT_APN: &str = "internet";

fn ok() -> ChatMatch {
    ChatMatch::new("OK")
}

/// Responses that fail any non-dial script
pub fn abort_matches() -> Vec<ChatMatch> {
    vec![ChatMatch::new("ERROR")]
}

/// Responses that fail the dial script
pub fn dial_abort_matches() -> Vec<ChatMatch> {
    ["ERROR", "BUSY", "NO ANSWER", "NO CARRIER", "NO DIALTONE"]
        .into_iter()
        .map(ChatMatch::new)
        .collect()
}

/// Registration reports the modem may emit at any time once `+CxREG=1` is set
pub fn unsol_matches() -> Vec<ChatMatch> {
    ["+CREG: ", "+CEREG: ", "+CGREG: "]
        .into_iter()
        .map(|p| ChatMatch::with_handler(p, ",", MatchHandler::Registration))
        .collect()
}

/// Wake the modem, enable registration reports, read identity and switch to CMUX
pub fn init_script() -> ChatScript {
    let mut chats: Vec<ScriptChat> = (0..4).map(|_| ScriptChat::cmd_resp_none("AT", 100)).collect();
    chats.extend(
        [
            "ATE0",
            "AT+CFUN=4",
            "AT+CMEE=1",
            "AT+CREG=1",
            "AT+CGREG=1",
            "AT+CEREG=1",
            "AT+CREG?",
            "AT+CEREG?",
            "AT+CGREG?",
        ]
        .into_iter()
        .map(|cmd| ScriptChat::cmd_resp(cmd, ok())),
    );
    for (cmd, handler) in [
        ("AT+CGSN", MatchHandler::Imei),
        ("AT+CGMM", MatchHandler::ModelId),
        ("AT+CGMI", MatchHandler::Manufacturer),
        ("AT+CGMR", MatchHandler::FwVersion),
    ] {
        chats.push(ScriptChat::cmd_resp(
            cmd,
            ChatMatch::with_handler("", "", handler),
        ));
        chats.push(ScriptChat::cmd_resp("", ok()));
    }
    chats.push(ScriptChat::cmd_resp_none("AT+CMUX=0,0,5,127", 300));

    ChatScript::new(INIT_SCRIPT, chats, abort_matches(), 10)
}

/// Define the PDP context and start PPP on the data channel
pub fn dial_script(apn: &str) -> ChatScript {
    let chats = vec![
        ScriptChat::cmd_resp_mult(
            "AT+CGACT=0,1",
            vec![ChatMatch::new("OK"), ChatMatch::new("ERROR")],
        ),
        ScriptChat::cmd_resp(format!("AT+CGDCONT=1,\"IP\",\"{}\"", apn), ok()),
        ScriptChat::cmd_resp("AT+CFUN=1", ok()),
        ScriptChat::cmd_resp_none("ATD*99***1#", 0),
    ];

    ChatScript::new(DIAL_SCRIPT, chats, dial_abort_matches(), 10)
}

/// Poll all three registration reports
pub fn periodic_script() -> ChatScript {
    let chats = ["AT+CREG?", "AT+CEREG?", "AT+CGREG?"]
        .into_iter()
        .map(|cmd| ScriptChat::cmd_resp(cmd, ok()))
        .collect();

    ChatScript::new(PERIODIC_SCRIPT, chats, abort_matches(), 4)
}

/// Read `+CSQ`
pub fn csq_script() -> ChatScript {
    query_script(
        CSQ_SCRIPT,
        "AT+CSQ",
        ChatMatch::with_handler("+CSQ: ", ",", MatchHandler::Csq),
    )
}

/// Read `+CESQ`
pub fn cesq_script() -> ChatScript {
    query_script(
        CESQ_SCRIPT,
        "AT+CESQ",
        ChatMatch::with_handler("+CESQ: ", ",", MatchHandler::Cesq),
    )
}

/// Read the subscriber identity
pub fn imsi_script() -> ChatScript {
    query_script(
        IMSI_SCRIPT,
        "AT+CIMI",
        ChatMatch::with_handler("", "", MatchHandler::Imsi),
    )
}

/// Read the SIM identifier
pub fn iccid_script() -> ChatScript {
    query_script(
        ICCID_SCRIPT,
        "AT+CCID",
        ChatMatch::with_handler("+CCID: ", "", MatchHandler::Iccid),
    )
}

fn query_script(name: &str, request: &str, response: ChatMatch) -> ChatScript {
    ChatScript::new(
        name,
        vec![
            ScriptChat::cmd_resp(request, response),
            ScriptChat::cmd_resp("", ok()),
        ],
        abort_matches(),
        2,
    )
}
