//! Trait abstractions over the platform Bluetooth stack.
//!
//! [`SensorAdapter`] and [`SensorPeripheral`] mirror the handful of GATT
//! operations the session manager needs. The btleplug backend in
//! [`crate::device`] implements them for real hardware and [`crate::mock`]
//! implements them for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use bioguard_types::uuid::{ANALYZER_SERVICE, DEVICE_NAME};

use crate::error::Result;
use crate::events::SessionEvents;

/// What to look for when requesting a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFilter {
    /// Exact advertised local name.
    pub name: String,
    /// Service the client is allowed to access after connecting.
    pub service: Uuid,
    /// Upper bound on how long to scan.
    pub scan_timeout: Duration,
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self {
            name: DEVICE_NAME.to_string(),
            service: ANALYZER_SERVICE,
            scan_timeout: Duration::from_secs(10),
        }
    }
}

impl DiscoveryFilter {
    /// Whether an advertised name satisfies the filter.
    pub fn matches_name(&self, name: &str) -> bool {
        name == self.name
    }
}

/// A resolved primary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandle {
    /// Service UUID.
    pub uuid: Uuid,
}

/// A resolved characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicHandle {
    /// Owning service UUID.
    pub service: Uuid,
    /// Characteristic UUID.
    pub uuid: Uuid,
}

/// Entry point into a platform Bluetooth stack.
#[async_trait]
pub trait SensorAdapter: Send + Sync {
    /// Fail with [`Error::CapabilityUnavailable`](crate::Error::CapabilityUnavailable)
    /// when the platform cannot do Bluetooth at all.
    async fn check_available(&self) -> Result<()>;

    /// Find one peripheral matching `filter`.
    async fn request_device(&self, filter: &DiscoveryFilter) -> Result<Arc<dyn SensorPeripheral>>;
}

/// One remote peripheral, before or after connecting.
///
/// Methods are called by the session manager in the order they are declared.
#[async_trait]
pub trait SensorPeripheral: Send + Sync {
    /// Advertised name, if known.
    fn name(&self) -> Option<&str>;

    /// Platform identifier (MAC address, or a UUID on macOS).
    fn identifier(&self) -> &str;

    /// Arrange for `events.session_lost()` to fire whenever the connection
    /// drops, whoever initiated it.
    async fn watch_disconnect(&self, events: SessionEvents) -> Result<()>;

    /// Establish the connection.
    async fn connect(&self) -> Result<()>;

    /// Whether the platform reports the link as up.
    async fn is_connected(&self) -> bool;

    /// Look up a primary service.
    async fn primary_service(&self, uuid: Uuid) -> Result<ServiceHandle>;

    /// Look up a characteristic on a resolved service.
    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<CharacteristicHandle>;

    /// Enable notification delivery for a characteristic.
    async fn start_notifications(&self, characteristic: &CharacteristicHandle) -> Result<()>;

    /// Route notifications for a characteristic into `events`.
    async fn subscribe(
        &self,
        characteristic: &CharacteristicHandle,
        events: SessionEvents,
    ) -> Result<()>;

    /// Read the current characteristic value.
    async fn read_value(&self, characteristic: &CharacteristicHandle) -> Result<Vec<u8>>;

    /// Request termination of the connection.
    async fn disconnect(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_analyzer() {
        let filter = DiscoveryFilter::default();
        assert_eq!(filter.name, "ESP32-AguaAnalyzer");
        assert_eq!(filter.service, ANALYZER_SERVICE);
        assert_eq!(filter.scan_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_name_match_is_exact() {
        let filter = DiscoveryFilter::default();
        assert!(filter.matches_name("ESP32-AguaAnalyzer"));
        assert!(!filter.matches_name("esp32-aguaanalyzer"));
        assert!(!filter.matches_name("ESP32-AguaAnalyzer 2"));
    }
}
