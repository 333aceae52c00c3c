//! Bluetooth identifiers for the Bio-Guard analyzer.
//!
//! These must match the values flashed into the ESP32 firmware.

use uuid::{Uuid, uuid};

/// Advertised local name of the analyzer peripheral.
pub const DEVICE_NAME: &str = "ESP32-AguaAnalyzer";

/// Primary GATT service exposed by the analyzer.
///
/// Used both as the discovery allowlist and as the service looked up after
/// connecting.
pub const ANALYZER_SERVICE: Uuid = uuid!("12345678-1234-1234-1234-123456789abc");

/// Characteristic carrying the delimited reading text (read + notify).
pub const READING_CHARACTERISTIC: Uuid = uuid!("87654321-4321-4321-4321-cba987654321");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_service_uuid() {
        let expected = "12345678-1234-1234-1234-123456789abc";
        assert_eq!(ANALYZER_SERVICE.to_string(), expected);
    }

    #[test]
    fn test_reading_characteristic_uuid() {
        let expected = "87654321-4321-4321-4321-cba987654321";
        assert_eq!(READING_CHARACTERISTIC.to_string(), expected);
    }

    #[test]
    fn test_uuids_are_distinct() {
        assert_ne!(ANALYZER_SERVICE, READING_CHARACTERISTIC);
    }

    #[test]
    fn test_device_name() {
        assert_eq!(DEVICE_NAME, "ESP32-AguaAnalyzer");
    }
}
