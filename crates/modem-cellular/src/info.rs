//! Identity and signal cache
//!
//! Filled in by matched chat responses, whether they come from the init
//! script, a periodic poll, an unsolicited report or a synchronous query.
//! The cache lives as long as the modem handle and is never cleared by a
//! suspend/resume cycle.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modem_chat::signal::{RSRP_UNKNOWN, RSRQ_UNKNOWN, RSSI_UNKNOWN};
use modem_chat::{AccessTechnology, ChatResponse, RegistrationSource, RegistrationStatus};
use serde::Serialize;

/// Maximum stored IMEI length
pub const IMEI_MAX_LEN: usize = 15;
/// Maximum stored model identifier length
pub const MODEL_ID_MAX_LEN: usize = 64;
/// Maximum stored IMSI length
pub const IMSI_MAX_LEN: usize = 22;
/// Maximum stored ICCID length
pub const ICCID_MAX_LEN: usize = 21;
/// Maximum stored manufacturer length
pub const MANUFACTURER_MAX_LEN: usize = 64;
/// Maximum stored firmware version length
pub const FW_VERSION_MAX_LEN: usize = 64;

/// Length of the link-layer address derived from the IMEI
pub const LINK_ADDR_LEN: usize = IMEI_MAX_LEN + 1;

/// Identity strings that can be read from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModemInfoType {
    Imei,
    ModelId,
    Manufacturer,
    FwVersion,
    Imsi,
    Iccid,
}

/// Signal figures that can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    /// Received signal strength, from `+CSQ`
    Rssi,
    /// Reference signal received power, from `+CESQ`
    Rsrp,
    /// Reference signal received quality, from `+CESQ`
    Rsrq,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalType::Rssi => "rssi",
            SignalType::Rsrp => "rsrp",
            SignalType::Rsrq => "rsrq",
        };
        f.write_str(name)
    }
}

/// Cached identity, signal and registration figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModemInfo {
    pub imei: String,
    pub model_id: String,
    pub manufacturer: String,
    pub fw_version: String,
    pub imsi: String,
    pub iccid: String,
    /// Raw `+CSQ` rssi index
    pub rssi: u8,
    /// Raw `+CESQ` rsrp index
    pub rsrp: u8,
    /// Raw `+CESQ` rsrq index
    pub rsrq: u8,
    /// Circuit-switched registration (`+CREG`)
    pub registration_gsm: RegistrationStatus,
    /// GPRS/UMTS registration (`+CGREG`)
    pub registration_gprs: RegistrationStatus,
    /// EPS registration (`+CEREG`)
    pub registration_lte: RegistrationStatus,
}

impl Default for ModemInfo {
    fn default() -> Self {
        Self {
            imei: String::new(),
            model_id: String::new(),
            manufacturer: String::new(),
            fw_version: String::new(),
            imsi: String::new(),
            iccid: String::new(),
            rssi: RSSI_UNKNOWN,
            rsrp: RSRP_UNKNOWN,
            rsrq: RSRQ_UNKNOWN,
            registration_gsm: RegistrationStatus::default(),
            registration_gprs: RegistrationStatus::default(),
            registration_lte: RegistrationStatus::default(),
        }
    }
}

impl ModemInfo {
    /// Record a parsed response
    pub fn apply(&mut self, response: &ChatResponse) {
        match response {
            ChatResponse::Imei(v) => self.imei = truncated(v, IMEI_MAX_LEN),
            ChatResponse::ModelId(v) => self.model_id = truncated(v, MODEL_ID_MAX_LEN),
            ChatResponse::Manufacturer(v) => {
                self.manufacturer = truncated(v, MANUFACTURER_MAX_LEN)
            }
            ChatResponse::FwVersion(v) => self.fw_version = truncated(v, FW_VERSION_MAX_LEN),
            ChatResponse::Imsi(v) => self.imsi = truncated(v, IMSI_MAX_LEN),
            ChatResponse::Iccid(v) => self.iccid = truncated(v, ICCID_MAX_LEN),
            ChatResponse::Csq { rssi } => self.rssi = *rssi,
            ChatResponse::Cesq { rsrq, rsrp } => {
                self.rsrq = *rsrq;
                self.rsrp = *rsrp;
            }
            ChatResponse::Registration { source, status } => match source {
                RegistrationSource::Creg => self.registration_gsm = *status,
                RegistrationSource::Cgreg => self.registration_gprs = *status,
                RegistrationSource::Cereg => self.registration_lte = *status,
            },
        }
    }

    /// Cached identity string
    pub fn get(&self, kind: ModemInfoType) -> &str {
        match kind {
            ModemInfoType::Imei => &self.imei,
            ModemInfoType::ModelId => &self.model_id,
            ModemInfoType::Manufacturer => &self.manufacturer,
            ModemInfoType::FwVersion => &self.fw_version,
            ModemInfoType::Imsi => &self.imsi,
            ModemInfoType::Iccid => &self.iccid,
        }
    }

    /// Registration status of the access class serving `tech`
    pub fn registration_status(&self, tech: AccessTechnology) -> RegistrationStatus {
        match tech.registration_source() {
            RegistrationSource::Creg => self.registration_gsm,
            RegistrationSource::Cgreg => self.registration_gprs,
            RegistrationSource::Cereg => self.registration_lte,
        }
    }

    /// Whether any access class is registered
    pub fn is_registered(&self) -> bool {
        self.registration_gsm.is_registered()
            || self.registration_gprs.is_registered()
            || self.registration_lte.is_registered()
    }

    /// Link-layer address: the IMEI digits, zero padded
    pub fn link_addr(&self) -> [u8; LINK_ADDR_LEN] {
        let mut addr = [0u8; LINK_ADDR_LEN];
        let bytes = self.imei.as_bytes();
        let len = bytes.len().min(IMEI_MAX_LEN);
        addr[..len].copy_from_slice(&bytes[..len]);
        addr
    }
}

fn truncated(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

/// Cache shared between the state machine, the chat listener and the handle
#[derive(Debug, Clone, Default)]
pub struct SharedInfo(Arc<Mutex<ModemInfo>>);

impl SharedInfo {
    /// Lock the cache
    pub fn lock(&self) -> MutexGuard<'_, ModemInfo> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current cache
    pub fn snapshot(&self) -> ModemInfo {
        self.lock().clone()
    }
}
