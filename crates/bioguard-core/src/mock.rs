//! Mock platform backend and recording sink for testing.
//!
//! [`MockAdapter`] and [`MockPeripheral`] implement the platform traits
//! without Bluetooth hardware, and [`RecordingSink`] captures everything the
//! core writes to the presentation.
//!
//! # Features
//!
//! - **Failure injection**: fail any single step of the connect sequence
//! - **Read failures**: make on-demand reads fail
//! - **Platform events**: push notifications and simulate peer-initiated drops

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use bioguard_types::StyleBucket;
use bioguard_types::uuid::{ANALYZER_SERVICE, DEVICE_NAME, READING_CHARACTERISTIC};

use crate::error::{ConnectStep, Error, Result};
use crate::events::SessionEvents;
use crate::sink::{PresentationSink, StatusKind, TriggerControl};
use crate::traits::{
    CharacteristicHandle, DiscoveryFilter, SensorAdapter, SensorPeripheral, ServiceHandle,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A mock Bluetooth stack with a single peripheral in range.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bioguard_core::mock::{MockAdapter, MockPeripheral};
/// use bioguard_core::SensorAdapter;
///
/// #[tokio::main]
/// async fn main() {
///     let peripheral = Arc::new(MockPeripheral::analyzer());
///     let adapter = MockAdapter::new(Arc::clone(&peripheral));
///     adapter.check_available().await.unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct MockAdapter {
    available: AtomicBool,
    peripheral: Arc<MockPeripheral>,
    request_count: AtomicU32,
}

impl MockAdapter {
    /// Create an adapter that will hand out `peripheral`.
    pub fn new(peripheral: Arc<MockPeripheral>) -> Self {
        Self {
            available: AtomicBool::new(true),
            peripheral,
            request_count: AtomicU32::new(0),
        }
    }

    /// Simulate a platform without Bluetooth.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of device requests made.
    pub fn request_count(&self) -> u32 {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorAdapter for MockAdapter {
    async fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::capability_unavailable("mock adapter disabled"))
        }
    }

    async fn request_device(&self, filter: &DiscoveryFilter) -> Result<Arc<dyn SensorPeripheral>> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let name_matches = self
            .peripheral
            .name()
            .is_some_and(|name| filter.matches_name(name));
        if !name_matches || self.peripheral.fails_at(ConnectStep::RequestDevice) {
            return Err(Error::DeviceNotFound {
                name: filter.name.clone(),
                duration: filter.scan_timeout,
            });
        }

        Ok(Arc::clone(&self.peripheral) as Arc<dyn SensorPeripheral>)
    }
}

/// A mock analyzer peripheral.
#[derive(Debug)]
pub struct MockPeripheral {
    name: String,
    identifier: String,
    service: Uuid,
    characteristic: Uuid,
    connected: AtomicBool,
    notifications_started: AtomicBool,
    fail_step: Mutex<Option<ConnectStep>>,
    fail_reads: AtomicBool,
    value: Mutex<Vec<u8>>,
    read_count: AtomicU32,
    disconnect_count: AtomicU32,
    lost_events: Mutex<Option<SessionEvents>>,
    value_events: Mutex<Option<SessionEvents>>,
}

impl MockPeripheral {
    /// Create a mock peripheral with the given name, exposing the analyzer
    /// service and characteristic.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            identifier: "MOCK-AA:BB:CC:DD:EE:FF".to_string(),
            service: ANALYZER_SERVICE,
            characteristic: READING_CHARACTERISTIC,
            connected: AtomicBool::new(false),
            notifications_started: AtomicBool::new(false),
            fail_step: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            value: Mutex::new(
                "Cor: Azul | Contaminação: Normal | Intensidade Luz: 10%"
                    .as_bytes()
                    .to_vec(),
            ),
            read_count: AtomicU32::new(0),
            disconnect_count: AtomicU32::new(0),
            lost_events: Mutex::new(None),
            value_events: Mutex::new(None),
        }
    }

    /// A mock advertising the real analyzer name.
    pub fn analyzer() -> Self {
        Self::new(DEVICE_NAME)
    }

    /// Fail the given connect step (or none).
    pub fn fail_at(&self, step: Option<ConnectStep>) {
        *lock(&self.fail_step) = step;
    }

    fn fails_at(&self, step: ConnectStep) -> bool {
        *lock(&self.fail_step) == Some(step)
    }

    fn check_step(&self, step: ConnectStep) -> Result<()> {
        if self.fails_at(step) {
            Err(Error::peripheral(format!("injected failure while {}", step)))
        } else {
            Ok(())
        }
    }

    /// Make on-demand reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Set the value returned by reads.
    pub fn set_value(&self, value: impl Into<Vec<u8>>) {
        *lock(&self.value) = value.into();
    }

    /// Push a notification, as the peripheral would on a value change.
    ///
    /// Returns false when nobody is subscribed.
    pub fn notify(&self, value: impl Into<Vec<u8>>) -> bool {
        if !self.notifications_started.load(Ordering::SeqCst) {
            return false;
        }
        match lock(&self.value_events).as_ref() {
            Some(events) => {
                events.value(value.into());
                true
            }
            None => false,
        }
    }

    /// Simulate the peer dropping the connection.
    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.notifications_started.store(false, Ordering::SeqCst);
        if let Some(events) = lock(&self.lost_events).as_ref() {
            events.session_lost();
        }
    }

    /// Whether the mock link is up.
    pub fn is_connected_sync(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of completed reads (including failed ones).
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Number of disconnect requests.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorPeripheral for MockPeripheral {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn watch_disconnect(&self, events: SessionEvents) -> Result<()> {
        self.check_step(ConnectStep::WatchDisconnect)?;
        *lock(&self.lost_events) = Some(events);
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        self.check_step(ConnectStep::Connect)?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.is_connected_sync()
    }

    async fn primary_service(&self, uuid: Uuid) -> Result<ServiceHandle> {
        self.check_step(ConnectStep::PrimaryService)?;
        if uuid != self.service {
            return Err(Error::ServiceNotFound {
                uuid: uuid.to_string(),
            });
        }
        Ok(ServiceHandle { uuid })
    }

    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<CharacteristicHandle> {
        self.check_step(ConnectStep::Characteristic)?;
        if uuid != self.characteristic {
            return Err(Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
                service: service.uuid.to_string(),
            });
        }
        Ok(CharacteristicHandle {
            service: service.uuid,
            uuid,
        })
    }

    async fn start_notifications(&self, _characteristic: &CharacteristicHandle) -> Result<()> {
        self.check_step(ConnectStep::StartNotifications)?;
        if !self.is_connected_sync() {
            return Err(Error::NotConnected);
        }
        self.notifications_started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(
        &self,
        _characteristic: &CharacteristicHandle,
        events: SessionEvents,
    ) -> Result<()> {
        self.check_step(ConnectStep::Subscribe)?;
        *lock(&self.value_events) = Some(events);
        Ok(())
    }

    async fn read_value(&self, _characteristic: &CharacteristicHandle) -> Result<Vec<u8>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if !self.is_connected_sync() {
            return Err(Error::NotConnected);
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::peripheral("injected read failure"));
        }
        Ok(lock(&self.value).clone())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);
        // The platform reports our own disconnects through the same watcher
        // as peer-initiated ones.
        self.drop_link();
        Ok(())
    }
}

/// One call made on a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    /// `set_status`.
    Status { message: String, kind: StatusKind },
    /// `set_summary`.
    Summary {
        color: String,
        contamination: String,
    },
    /// `set_light_text`.
    LightText(String),
    /// `set_fill`.
    Fill {
        percent: Option<u8>,
        bucket: Option<StyleBucket>,
    },
    /// `set_trigger`.
    Trigger(TriggerControl),
    /// `alert`.
    Alert(String),
}

/// A sink that records every call and tracks the resulting state.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    fill_height: Option<u8>,
    bucket: Option<StyleBucket>,
    height_writes: usize,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call, in order.
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Forget recorded calls, keeping the gauge state.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Current gauge height.
    pub fn fill_height(&self) -> Option<u8> {
        self.fill_height
    }

    /// Currently applied bucket.
    pub fn bucket(&self) -> Option<StyleBucket> {
        self.bucket
    }

    /// How many times the gauge height was written.
    pub fn height_writes(&self) -> usize {
        self.height_writes
    }

    /// Latest status line.
    pub fn status(&self) -> Option<(&str, StatusKind)> {
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::Status { message, kind } => Some((message.as_str(), *kind)),
            _ => None,
        })
    }

    /// Latest trigger control state.
    pub fn trigger(&self) -> Option<&TriggerControl> {
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::Trigger(control) => Some(control),
            _ => None,
        })
    }

    /// Latest light readout.
    pub fn light_text(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::LightText(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Alerts raised so far.
    pub fn alerts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn set_status(&mut self, message: &str, kind: StatusKind) {
        self.calls.push(SinkCall::Status {
            message: message.to_string(),
            kind,
        });
    }

    fn set_summary(&mut self, color: &str, contamination: &str) {
        self.calls.push(SinkCall::Summary {
            color: color.to_string(),
            contamination: contamination.to_string(),
        });
    }

    fn set_light_text(&mut self, text: &str) {
        self.calls.push(SinkCall::LightText(text.to_string()));
    }

    fn set_fill(&mut self, percent: Option<u8>, bucket: Option<StyleBucket>) {
        self.bucket = bucket;
        if let Some(percent) = percent {
            self.fill_height = Some(percent);
            self.height_writes += 1;
        }
        self.calls.push(SinkCall::Fill { percent, bucket });
    }

    fn set_trigger(&mut self, control: TriggerControl) {
        self.calls.push(SinkCall::Trigger(control));
    }

    fn alert(&mut self, message: &str) {
        self.calls.push(SinkCall::Alert(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LinkEvent, event_channel};

    #[tokio::test]
    async fn test_mock_adapter_filters_by_name() {
        let peripheral = Arc::new(MockPeripheral::new("Other Device"));
        let adapter = MockAdapter::new(peripheral);

        let result = adapter.request_device(&DiscoveryFilter::default()).await;
        assert!(matches!(result, Err(Error::DeviceNotFound { .. })));
        assert_eq!(adapter.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_adapter_unavailable() {
        let adapter = MockAdapter::new(Arc::new(MockPeripheral::analyzer()));
        adapter.set_available(false);
        let err = adapter.check_available().await.unwrap_err();
        assert!(err.is_capability_unavailable());
    }

    #[tokio::test]
    async fn test_mock_disconnect_reports_session_lost() {
        let peripheral = MockPeripheral::analyzer();
        let (tx, mut rx) = event_channel();
        peripheral.watch_disconnect(SessionEvents::new(3, tx)).await.unwrap();
        peripheral.connect().await.unwrap();

        peripheral.disconnect().await.unwrap();

        assert!(!peripheral.is_connected_sync());
        assert_eq!(rx.try_recv().unwrap(), LinkEvent::SessionLost { generation: 3 });
        assert_eq!(peripheral.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_notify_requires_subscription() {
        let peripheral = MockPeripheral::analyzer();
        assert!(!peripheral.notify(b"x".to_vec()));
    }

    #[tokio::test]
    async fn test_mock_read_requires_connection() {
        let peripheral = MockPeripheral::analyzer();
        let handle = CharacteristicHandle {
            service: ANALYZER_SERVICE,
            uuid: READING_CHARACTERISTIC,
        };
        assert!(matches!(peripheral.read_value(&handle).await, Err(Error::NotConnected)));
        assert_eq!(peripheral.read_count(), 1);
    }

    #[test]
    fn test_recording_sink_fill_semantics() {
        let mut sink = RecordingSink::new();
        sink.set_fill(Some(66), Some(StyleBucket::Media));
        sink.set_fill(None, None);

        assert_eq!(sink.fill_height(), Some(66));
        assert_eq!(sink.bucket(), None);
        assert_eq!(sink.height_writes(), 1);
        assert_eq!(sink.calls().len(), 2);
    }
}
