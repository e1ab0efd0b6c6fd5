//! Serial port scanner
//!
//! Lists serial ports and flags those whose USB vendor makes cellular modems.

use serde::Serialize;
use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::ProbeError;

/// USB vendor IDs of common cellular module makers
const MODEM_VENDORS: &[(u16, &str)] = &[
    (0x05c6, "Qualcomm"),
    (0x1199, "Sierra Wireless"),
    (0x1bc7, "Telit"),
    (0x1e0e, "SIMCom"),
    (0x2c7c, "Quectel"),
    (0x1546, "u-blox"),
    (0x12d1, "Huawei"),
];

/// Information about a serial port
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    /// Port name (e.g., /dev/ttyUSB2, COM7)
    pub port: String,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB product string
    pub product: Option<String>,
    /// Module maker, when the vendor ID is a known one
    pub modem_vendor: Option<&'static str>,
}

impl PortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                port: name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product.clone(),
                modem_vendor: modem_vendor(usb.vid),
            },
            _ => Self {
                port: name,
                vid: None,
                pid: None,
                product: None,
                modem_vendor: None,
            },
        }
    }

    pub fn is_likely_modem(&self) -> bool {
        self.modem_vendor.is_some()
    }
}

fn modem_vendor(vid: u16) -> Option<&'static str> {
    MODEM_VENDORS
        .iter()
        .find(|(id, _)| *id == vid)
        .map(|(_, name)| *name)
}

/// Enumerate serial ports, likely modems first
pub fn enumerate_ports() -> Result<Vec<PortInfo>, ProbeError> {
    let mut ports: Vec<_> = available_ports()?
        .into_iter()
        .map(|p| PortInfo::from_serialport(p.port_name, &p.port_type))
        .filter(|p| !p.port.contains("Bluetooth"))
        .collect();
    ports.sort_by_key(|p| (!p.is_likely_modem(), p.port.clone()));

    info!("found {} serial port(s)", ports.len());
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    #[test]
    fn test_usb_modem_is_recognised() {
        let usb = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x2c7c,
            pid: 0x0125,
            serial_number: None,
            manufacturer: Some("Quectel".to_string()),
            product: Some("EG25-G".to_string()),
        });

        let info = PortInfo::from_serialport("/dev/ttyUSB2".to_string(), &usb);
        assert_eq!(info.modem_vendor, Some("Quectel"));
        assert!(info.is_likely_modem());
        assert_eq!(info.product.as_deref(), Some("EG25-G"));
    }

    #[test]
    fn test_other_ports_are_not_modems() {
        let info = PortInfo::from_serialport("/dev/ttyS0".to_string(), &SerialPortType::Unknown);
        assert!(!info.is_likely_modem());
        assert_eq!(info.vid, None);
    }
}
