//! btleplug backend for the platform traits.
//!
//! [`BleAdapter`] and [`BlePeripheral`] adapt btleplug's central API to
//! [`SensorAdapter`] and [`SensorPeripheral`]. Notification and disconnect
//! watchers run as spawned tasks that forward into the session's event
//! channel; they are aborted when the peripheral is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::SessionEvents;
use crate::scan::{find_by_name, get_adapter};
use crate::traits::{
    CharacteristicHandle, DiscoveryFilter, SensorAdapter, SensorPeripheral, ServiceHandle,
};

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts for BLE link operations.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bioguard_core::device::LinkConfig;
///
/// let config = LinkConfig::default().connect_timeout(Duration::from_secs(30));
/// assert_eq!(config.connect_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    /// Timeout for GATT service discovery after connecting.
    pub discovery_timeout: Duration,
    /// Timeout for a single characteristic read.
    pub read_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl LinkConfig {
    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Reject zero timeouts, which would fail every operation immediately.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::invalid_config("connect timeout must be non-zero"));
        }
        if self.discovery_timeout.is_zero() {
            return Err(Error::invalid_config("discovery timeout must be non-zero"));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::invalid_config("read timeout must be non-zero"));
        }
        Ok(())
    }
}

/// The platform's first Bluetooth adapter, resolved lazily.
#[derive(Default)]
pub struct BleAdapter {
    adapter: OnceCell<Adapter>,
    config: LinkConfig,
}

impl std::fmt::Debug for BleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleAdapter")
            .field("initialized", &self.adapter.initialized())
            .field("config", &self.config)
            .finish()
    }
}

impl BleAdapter {
    /// Create an adapter handle; nothing touches the Bluetooth stack yet.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            adapter: OnceCell::new(),
            config,
        }
    }

    async fn adapter(&self) -> Result<&Adapter> {
        self.adapter.get_or_try_init(get_adapter).await
    }
}

#[async_trait]
impl SensorAdapter for BleAdapter {
    async fn check_available(&self) -> Result<()> {
        self.adapter().await.map(|_| ())
    }

    async fn request_device(&self, filter: &DiscoveryFilter) -> Result<Arc<dyn SensorPeripheral>> {
        let adapter = self.adapter().await?;
        let peripheral = find_by_name(adapter, filter).await?;
        let device = BlePeripheral::new(adapter.clone(), peripheral, self.config.clone()).await?;
        Ok(Arc::new(device))
    }
}

/// A peripheral reached through btleplug.
///
/// Dropping it aborts the watcher tasks and, unless [`SensorPeripheral::disconnect`]
/// was called, spawns a best-effort disconnect.
pub struct BlePeripheral {
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    identifier: String,
    config: LinkConfig,
    /// Characteristics resolved so far, by UUID.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
    /// Watcher tasks (disconnect, notifications).
    tasks: Mutex<Vec<JoinHandle<()>>>,
    disconnected: AtomicBool,
}

impl std::fmt::Debug for BlePeripheral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlePeripheral")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

impl BlePeripheral {
    async fn new(adapter: Adapter, peripheral: Peripheral, config: LinkConfig) -> Result<Self> {
        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());
        let identifier = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(Self {
            adapter,
            peripheral,
            name,
            identifier,
            config,
            characteristics: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
        })
    }

    fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(handle);
        }
    }

    async fn resolved(&self, handle: &CharacteristicHandle) -> Result<Characteristic> {
        self.characteristics
            .read()
            .await
            .get(&handle.uuid)
            .cloned()
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: handle.uuid.to_string(),
                service: handle.service.to_string(),
            })
    }
}

#[async_trait]
impl SensorPeripheral for BlePeripheral {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn watch_disconnect(&self, events: SessionEvents) -> Result<()> {
        let mut stream = self.adapter.events().await?;
        let id: PeripheralId = self.peripheral.id();

        self.track(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let CentralEvent::DeviceDisconnected(lost) = event
                    && lost == id
                {
                    debug!("Peripheral reported disconnected");
                    events.session_lost();
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        info!("Connecting to device...");
        timeout(self.config.connect_timeout, self.peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.config.connect_timeout))??;
        info!("Connected!");

        info!("Discovering services...");
        timeout(self.config.discovery_timeout, self.peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;
        debug!("Found {} services", self.peripheral.services().len());
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn primary_service(&self, uuid: Uuid) -> Result<ServiceHandle> {
        self.peripheral
            .services()
            .iter()
            .find(|s| s.uuid == uuid && s.primary)
            .map(|s| ServiceHandle { uuid: s.uuid })
            .ok_or_else(|| Error::ServiceNotFound {
                uuid: uuid.to_string(),
            })
    }

    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<CharacteristicHandle> {
        let characteristic = self
            .peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service.uuid)
            .and_then(|s| s.characteristics.into_iter().find(|c| c.uuid == uuid))
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
                service: service.uuid.to_string(),
            })?;

        debug!("Characteristic: {} ({:?})", characteristic.uuid, characteristic.properties);
        self.characteristics
            .write()
            .await
            .insert(uuid, characteristic);

        Ok(CharacteristicHandle {
            service: service.uuid,
            uuid,
        })
    }

    async fn start_notifications(&self, characteristic: &CharacteristicHandle) -> Result<()> {
        let resolved = self.resolved(characteristic).await?;
        self.peripheral.subscribe(&resolved).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        characteristic: &CharacteristicHandle,
        events: SessionEvents,
    ) -> Result<()> {
        let mut stream = self.peripheral.notifications().await?;
        let char_uuid = characteristic.uuid;

        self.track(tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == char_uuid {
                    events.value(notification.value);
                }
            }
        }));
        Ok(())
    }

    async fn read_value(&self, characteristic: &CharacteristicHandle) -> Result<Vec<u8>> {
        let resolved = self.resolved(characteristic).await?;
        let data = timeout(self.config.read_timeout, self.peripheral.read(&resolved))
            .await
            .map_err(|_| {
                Error::timeout(
                    format!("read characteristic {}", characteristic.uuid),
                    self.config.read_timeout,
                )
            })??;
        Ok(data)
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.disconnected.store(true, Ordering::SeqCst);
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for BlePeripheral {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for handle in tasks.drain(..) {
                handle.abort();
            }
        }

        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }

        let peripheral = self.peripheral.clone();
        let identifier = self.identifier.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                match peripheral.disconnect().await {
                    Ok(()) => debug!(device = %identifier, "Best-effort disconnect completed"),
                    Err(e) => debug!(
                        device = %identifier,
                        error = %e,
                        "Best-effort disconnect failed (device may already be disconnected)"
                    ),
                }
            });
        } else {
            warn!(device = %identifier, "Peripheral dropped outside a runtime; not disconnecting");
        }
    }
}

/// Format a peripheral ID as a string.
///
/// On macOS peripheral IDs are UUIDs; elsewhere they wrap the address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Prefer the address, falling back to the peripheral ID where the platform
/// hides addresses (macOS reports all zeros).
fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_config_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.discovery_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_link_config_builder() {
        let config = LinkConfig::default()
            .connect_timeout(Duration::from_secs(20))
            .discovery_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.discovery_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_link_config_rejects_zero_timeouts() {
        assert!(LinkConfig::default().validate().is_ok());

        let err = LinkConfig::default()
            .connect_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("connect timeout"));

        assert!(
            LinkConfig::default()
                .discovery_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            LinkConfig::default()
                .read_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
