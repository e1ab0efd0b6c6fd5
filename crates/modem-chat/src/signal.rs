//! Signal quality conversions
//!
//! Raw `+CSQ` and `+CESQ` fields are small unsigned indices. These helpers
//! map them onto dBm/dB figures, returning `None` for the "not known or not
//! detectable" sentinel.

/// `+CSQ` rssi value meaning "not known"
pub const RSSI_UNKNOWN: u8 = 99;

/// `+CESQ` rsrp value meaning "not known"
pub const RSRP_UNKNOWN: u8 = 255;

/// `+CESQ` rsrq value meaning "not known"
pub const RSRQ_UNKNOWN: u8 = 255;

/// Received signal strength in dBm
pub fn rssi_dbm(raw: u8) -> Option<i16> {
    if raw == RSSI_UNKNOWN {
        return None;
    }
    Some(-113 + 2 * i16::from(raw))
}

/// Reference signal received power in dBm
pub fn rsrp_dbm(raw: u8) -> Option<i16> {
    if raw == RSRP_UNKNOWN {
        return None;
    }
    Some(-140 + i16::from(raw))
}

/// Reference signal received quality in dB
pub fn rsrq_db(raw: u8) -> Option<i16> {
    if raw == RSRQ_UNKNOWN {
        return None;
    }
    Some(-20 + i16::from(raw) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rssi() {
        assert_eq!(rssi_dbm(0), Some(-113));
        assert_eq!(rssi_dbm(31), Some(-51));
        assert_eq!(rssi_dbm(RSSI_UNKNOWN), None);
    }

    #[test]
    fn test_rsrp() {
        assert_eq!(rsrp_dbm(0), Some(-140));
        assert_eq!(rsrp_dbm(97), Some(-43));
        assert_eq!(rsrp_dbm(RSRP_UNKNOWN), None);
    }

    #[test]
    fn test_rsrq_rounds_toward_zero() {
        assert_eq!(rsrq_db(0), Some(-20));
        assert_eq!(rsrq_db(33), Some(-4));
        assert_eq!(rsrq_db(34), Some(-3));
        assert_eq!(rsrq_db(RSRQ_UNKNOWN), None);
    }

    proptest! {
        #[test]
        fn rssi_is_monotonic(a in 0u8..99, b in 0u8..99) {
            prop_assume!(a < b);
            prop_assert!(rssi_dbm(a) < rssi_dbm(b));
        }
    }
}
