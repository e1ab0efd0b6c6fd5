//! Typed parsing of matched response arguments
//!
//! A chat driver hands the owner of a script the split argument vector of
//! each response whose [`ChatMatch`](crate::ChatMatch) names a handler.
//! [`ChatResponse::parse`] turns that vector into a typed value. Argument
//! vectors always start with the match token itself.

use crate::error::ParseError;
use crate::registration::{RegistrationSource, RegistrationStatus};
use crate::script::MatchHandler;

/// A parsed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatResponse {
    Imei(String),
    ModelId(String),
    Manufacturer(String),
    FwVersion(String),
    Imsi(String),
    Iccid(String),
    /// `+CSQ: <rssi>,<ber>`
    Csq { rssi: u8 },
    /// `+CESQ: <rxlev>,<ber>,<rscp>,<ecno>,<rsrq>,<rsrp>`
    Cesq { rsrq: u8, rsrp: u8 },
    /// `+CxREG: [<n>,]<stat>[,...]`
    Registration {
        source: RegistrationSource,
        status: RegistrationStatus,
    },
}

impl ChatResponse {
    /// Parse the argument vector of a response matched with `handler`
    pub fn parse(handler: MatchHandler, argv: &[&str]) -> Result<Self, ParseError> {
        match handler {
            MatchHandler::Imei => single(argv).map(ChatResponse::Imei),
            MatchHandler::ModelId => single(argv).map(ChatResponse::ModelId),
            MatchHandler::Manufacturer => single(argv).map(ChatResponse::Manufacturer),
            MatchHandler::FwVersion => single(argv).map(ChatResponse::FwVersion),
            MatchHandler::Imsi => single(argv).map(ChatResponse::Imsi),
            MatchHandler::Iccid => single(argv).map(ChatResponse::Iccid),
            MatchHandler::Csq => {
                expect_count(argv, 3, "3")?;
                Ok(ChatResponse::Csq {
                    rssi: number(argv[1])?,
                })
            }
            MatchHandler::Cesq => {
                expect_count(argv, 7, "7")?;
                Ok(ChatResponse::Cesq {
                    rsrq: number(argv[5])?,
                    rsrp: number(argv[6])?,
                })
            }
            MatchHandler::Registration => {
                // The unsolicited form carries <stat> alone, the query form
                // leads with <n>, and the extended forms add location fields.
                let stat = match argv.len() {
                    2 => argv[1],
                    3 | 6 => argv[2],
                    actual => {
                        return Err(ParseError::ArgumentCount {
                            expected: "2, 3 or 6",
                            actual,
                        })
                    }
                };
                Ok(ChatResponse::Registration {
                    source: RegistrationSource::from_token(argv[0]),
                    status: RegistrationStatus::from_code(number(stat)?),
                })
            }
        }
    }
}

fn expect_count(argv: &[&str], count: usize, expected: &'static str) -> Result<(), ParseError> {
    if argv.len() != count {
        return Err(ParseError::ArgumentCount {
            expected,
            actual: argv.len(),
        });
    }
    Ok(())
}

fn single(argv: &[&str]) -> Result<String, ParseError> {
    expect_count(argv, 2, "2")?;
    Ok(argv[1].trim().to_string())
}

fn number(field: &str) -> Result<u8, ParseError> {
    field
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidNumber(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_one_argument() {
        let parsed = ChatResponse::parse(MatchHandler::Imei, &["", "350457790000001"]).unwrap();
        assert_eq!(parsed, ChatResponse::Imei("350457790000001".into()));

        let err = ChatResponse::parse(MatchHandler::Imei, &[""]).unwrap_err();
        assert!(matches!(err, ParseError::ArgumentCount { actual: 1, .. }));
    }

    #[test]
    fn test_csq() {
        let parsed = ChatResponse::parse(MatchHandler::Csq, &["+CSQ: ", "17", "99"]).unwrap();
        assert_eq!(parsed, ChatResponse::Csq { rssi: 17 });

        assert!(ChatResponse::parse(MatchHandler::Csq, &["+CSQ: ", "17"]).is_err());
    }

    #[test]
    fn test_cesq_picks_rsrq_and_rsrp() {
        let argv = ["+CESQ: ", "99", "99", "255", "255", "20", "50"];
        let parsed = ChatResponse::parse(MatchHandler::Cesq, &argv).unwrap();
        assert_eq!(parsed, ChatResponse::Cesq { rsrq: 20, rsrp: 50 });
    }

    #[test]
    fn test_registration_forms() {
        let unsolicited = ChatResponse::parse(MatchHandler::Registration, &["+CREG: ", "5"]);
        assert_eq!(
            unsolicited.unwrap(),
            ChatResponse::Registration {
                source: RegistrationSource::Creg,
                status: RegistrationStatus::RegisteredRoaming,
            }
        );

        let query = ChatResponse::parse(MatchHandler::Registration, &["+CEREG: ", "1", "1"]);
        assert_eq!(
            query.unwrap(),
            ChatResponse::Registration {
                source: RegistrationSource::Cereg,
                status: RegistrationStatus::RegisteredHome,
            }
        );

        let extended = [
            "+CGREG: ", "2", "2", "\"1A2B\"", "\"01C3D4E5\"", "7",
        ];
        assert_eq!(
            ChatResponse::parse(MatchHandler::Registration, &extended).unwrap(),
            ChatResponse::Registration {
                source: RegistrationSource::Cgreg,
                status: RegistrationStatus::Searching,
            }
        );
    }

    #[test]
    fn test_registration_other_counts_rejected() {
        let argv = ["+CEREG: ", "2", "1", "\"1A2B\""];
        assert!(ChatResponse::parse(MatchHandler::Registration, &argv).is_err());
    }

    #[test]
    fn test_non_numeric_field() {
        let err = ChatResponse::parse(MatchHandler::Csq, &["+CSQ: ", "x", "99"]).unwrap_err();
        assert_eq!(err, ParseError::InvalidNumber("x".into()));
    }
}
