//! Connection lifecycle for one analyzer.
//!
//! [`SessionManager`] owns the current [`Session`], the presentation sink
//! and the receiving end of the platform event channel. All state changes
//! happen on the task that drives the manager:
//!
//! ```text
//!            connect()                 chain succeeds
//!   Idle ─────────────────▶ Connecting ───────────────▶ Connected
//!    ▲                          │                           │
//!    │        step failed       │      session lost         │
//!    └──────────────────────────┴───────────────────────────┘
//! ```
//!
//! There is no automatic reconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use bioguard_types::Reading;
use bioguard_types::uuid::READING_CHARACTERISTIC;

use crate::decoder;
use crate::error::{ConnectStep, Error, Result};
use crate::events::{
    EventReceiver, EventSender, LinkEvent, SessionEvents, SessionGeneration, event_channel,
};
use crate::poller::{self, DEFAULT_POLL_INTERVAL, Poller};
use crate::sink::{
    ALERT_UNSUPPORTED, PresentationSink, STATUS_CONNECTED, STATUS_DISCONNECTED, STATUS_SEARCHING,
    StatusKind, TriggerControl, status_connecting, status_failed,
};
use crate::traits::{
    CharacteristicHandle, DiscoveryFilter, SensorAdapter, SensorPeripheral, ServiceHandle,
};

/// Lifecycle state of a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session.
    #[default]
    Idle,
    /// The connect sequence is running.
    Connecting,
    /// Notifications and polling are active.
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

/// What to connect to and how often to poll.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bioguard_core::SessionConfig;
///
/// let config = SessionConfig::default()
///     .device_name("ESP32-Bancada")
///     .poll_interval(Duration::from_millis(500));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Device discovery filter. Its service is also the one looked up after
    /// connecting.
    pub filter: DiscoveryFilter,
    /// Characteristic carrying the readings.
    pub characteristic: Uuid,
    /// Period between on-demand reads.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: DiscoveryFilter::default(),
            characteristic: READING_CHARACTERISTIC,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Set the advertised device name to look for.
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.filter.name = name.into();
        self
    }

    /// Set the primary service UUID.
    #[must_use]
    pub fn service_uuid(mut self, uuid: Uuid) -> Self {
        self.filter.service = uuid;
        self
    }

    /// Set the reading characteristic UUID.
    #[must_use]
    pub fn characteristic_uuid(mut self, uuid: Uuid) -> Self {
        self.characteristic = uuid;
        self
    }

    /// Set the poll period.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the scan timeout.
    #[must_use]
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.filter.scan_timeout = timeout;
        self
    }

    /// Check the configuration for values the manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.filter.name.trim().is_empty() {
            return Err(Error::invalid_config("device name must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::invalid_config("poll interval must be non-zero"));
        }
        if self.filter.scan_timeout.is_zero() {
            return Err(Error::invalid_config("scan timeout must be non-zero"));
        }
        Ok(())
    }
}

/// An established (or establishing) connection.
///
/// Handles are filled in as each connect step succeeds. The poller is
/// present exactly while the session is marked connected.
pub struct Session {
    generation: SessionGeneration,
    peripheral: Arc<dyn SensorPeripheral>,
    service: Option<ServiceHandle>,
    characteristic: Option<CharacteristicHandle>,
    connected: Arc<AtomicBool>,
    poller: Option<Poller>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generation", &self.generation)
            .field("peripheral", &self.peripheral.identifier())
            .field("service", &self.service)
            .field("characteristic", &self.characteristic)
            .field("connected", &self.is_connected())
            .field("polling", &self.is_polling())
            .finish()
    }
}

impl Session {
    fn new(generation: SessionGeneration, peripheral: Arc<dyn SensorPeripheral>) -> Self {
        Self {
            generation,
            peripheral,
            service: None,
            characteristic: None,
            connected: Arc::new(AtomicBool::new(false)),
            poller: None,
        }
    }

    /// Generation stamped on this session's events.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    /// The connected peripheral.
    pub fn peripheral(&self) -> &Arc<dyn SensorPeripheral> {
        &self.peripheral
    }

    /// The resolved primary service.
    pub fn service(&self) -> Option<&ServiceHandle> {
        self.service.as_ref()
    }

    /// The resolved reading characteristic.
    pub fn characteristic(&self) -> Option<&CharacteristicHandle> {
        self.characteristic.as_ref()
    }

    /// Whether the session is marked connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether the poll timer is active.
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(Poller::is_running)
    }

    fn start_polling(&mut self, period: Duration, events: SessionEvents) {
        let peripheral = Arc::clone(&self.peripheral);
        let characteristic = self.characteristic;
        let connected = Arc::clone(&self.connected);

        self.poller = Some(Poller::start(period, move || {
            poller::read_tick(
                Arc::clone(&peripheral),
                characteristic,
                Arc::clone(&connected),
                events.clone(),
            )
        }));
    }

    fn tear_down(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(poller) = self.poller.take() {
            poller.stop();
            info!("Poll timer stopped");
        }
    }
}

/// Drives the connect sequence and reacts to platform events.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bioguard_core::mock::{MockAdapter, MockPeripheral, RecordingSink};
/// use bioguard_core::{SessionConfig, SessionManager, SessionState};
///
/// #[tokio::main]
/// async fn main() -> bioguard_core::Result<()> {
///     let peripheral = Arc::new(MockPeripheral::analyzer());
///     let adapter = Arc::new(MockAdapter::new(Arc::clone(&peripheral)));
///     let mut manager =
///         SessionManager::new(adapter, RecordingSink::new(), SessionConfig::default())?;
///
///     manager.connect().await?;
///     assert_eq!(manager.state(), SessionState::Connected);
///
///     manager.disconnect().await?;
///     manager.process_pending();
///     assert_eq!(manager.state(), SessionState::Idle);
///     Ok(())
/// }
/// ```
pub struct SessionManager<S> {
    adapter: Arc<dyn SensorAdapter>,
    sink: S,
    config: SessionConfig,
    state: SessionState,
    session: Option<Session>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    next_generation: SessionGeneration,
}

impl<S> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<S: PresentationSink> SessionManager<S> {
    /// Create an idle manager.
    pub fn new(adapter: Arc<dyn SensorAdapter>, sink: S, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let (events_tx, events_rx) = event_channel();
        Ok(Self {
            adapter,
            sink,
            config,
            state: SessionState::Idle,
            session: None,
            events_tx,
            events_rx,
            next_generation: 1,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a session is up.
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The presentation sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the presentation sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the manager, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run the connect sequence.
    ///
    /// Returns [`Error::CapabilityUnavailable`] (after raising an alert) when
    /// the platform has no Bluetooth, [`Error::InvalidState`] when not idle,
    /// and [`Error::DiscoveryFailed`] naming the failed step otherwise. Every
    /// failure leaves the manager idle with the connect control re-enabled.
    #[tracing::instrument(skip(self), fields(device = %self.config.filter.name))]
    pub async fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(Error::InvalidState(format!(
                "cannot connect while {}",
                self.state
            )));
        }

        if let Err(e) = self.adapter.check_available().await {
            warn!("Bluetooth unavailable: {}", e);
            self.sink.alert(ALERT_UNSUPPORTED);
            return Err(match e {
                Error::CapabilityUnavailable(_) => e,
                other => Error::capability_unavailable(other.to_string()),
            });
        }

        self.state = SessionState::Connecting;
        self.sink.set_trigger(TriggerControl::connecting());
        self.sink.set_status(STATUS_SEARCHING, StatusKind::Disconnected);

        let generation = self.next_generation;
        self.next_generation += 1;

        match self.establish(generation).await {
            Ok(mut session) => {
                session.connected.store(true, Ordering::SeqCst);
                session.start_polling(
                    self.config.poll_interval,
                    SessionEvents::new(generation, self.events_tx.clone()),
                );
                self.session = Some(session);
                self.state = SessionState::Connected;

                self.sink.set_trigger(TriggerControl::disconnect());
                self.sink.set_status(STATUS_CONNECTED, StatusKind::Connected);
                info!(
                    generation,
                    interval_ms = self.config.poll_interval.as_millis() as u64,
                    "Connection established"
                );
                Ok(())
            }
            Err(e) => {
                warn!("Connection failed: {}", e);
                self.state = SessionState::Idle;
                self.sink.set_trigger(TriggerControl::connect());
                self.sink
                    .set_status(&status_failed(&e.reason()), StatusKind::Disconnected);
                Err(e)
            }
        }
    }

    /// Steps (a) through (g). The partial session is dropped on failure.
    async fn establish(&mut self, generation: SessionGeneration) -> Result<Session> {
        let events = SessionEvents::new(generation, self.events_tx.clone());

        info!("Requesting device...");
        let peripheral = self
            .adapter
            .request_device(&self.config.filter)
            .await
            .map_err(|e| Error::discovery(ConnectStep::RequestDevice, e))?;

        let name = peripheral
            .name()
            .unwrap_or(&self.config.filter.name)
            .to_string();
        info!(device = %name, id = %peripheral.identifier(), "Device selected");
        self.sink
            .set_status(&status_connecting(&name), StatusKind::Disconnected);

        let mut session = Session::new(generation, Arc::clone(&peripheral));

        peripheral
            .watch_disconnect(events.clone())
            .await
            .map_err(|e| Error::discovery(ConnectStep::WatchDisconnect, e))?;

        info!("Connecting to GATT server...");
        peripheral
            .connect()
            .await
            .map_err(|e| Error::discovery(ConnectStep::Connect, e))?;

        info!("Getting primary service...");
        let service = peripheral
            .primary_service(self.config.filter.service)
            .await
            .map_err(|e| Error::discovery(ConnectStep::PrimaryService, e))?;
        session.service = Some(service);

        info!("Getting characteristic...");
        let characteristic = peripheral
            .characteristic(&service, self.config.characteristic)
            .await
            .map_err(|e| Error::discovery(ConnectStep::Characteristic, e))?;
        session.characteristic = Some(characteristic);

        info!("Starting notifications...");
        peripheral
            .start_notifications(&characteristic)
            .await
            .map_err(|e| Error::discovery(ConnectStep::StartNotifications, e))?;

        peripheral
            .subscribe(&characteristic, events)
            .await
            .map_err(|e| Error::discovery(ConnectStep::Subscribe, e))?;

        Ok(session)
    }

    /// Ask the peripheral to end the session.
    ///
    /// Teardown happens when the platform reports the loss, through the same
    /// path as a peer-initiated drop. Does nothing when there is no session
    /// or the platform already reports the link down.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            debug!("Disconnect requested without a session");
            return Ok(());
        };
        if !session.peripheral.is_connected().await {
            debug!("Disconnect requested but the link is already down");
            return Ok(());
        }

        info!("Disconnecting...");
        session.peripheral.disconnect().await
    }

    /// Handle loss of the session, whoever caused it.
    ///
    /// Safe to call any number of times; the end state is always idle with
    /// the connect control enabled and no poll timer.
    pub fn on_disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.tear_down();
        }
        self.state = SessionState::Idle;

        self.sink.set_trigger(TriggerControl::connect());
        self.sink
            .set_status(STATUS_DISCONNECTED, StatusKind::Disconnected);
        info!("Bluetooth device disconnected");
    }

    /// Decode and render one characteristic value.
    pub fn on_value(&mut self, data: &[u8]) -> Option<Reading> {
        debug!(len = data.len(), "Data received");
        decoder::handle_payload(data, &mut self.sink).ok()
    }

    /// Dispatch one platform event.
    ///
    /// Events stamped with any generation other than the current session's
    /// are ignored. Returns the rendered reading, if the event produced one.
    pub fn handle_event(&mut self, event: LinkEvent) -> Option<Reading> {
        let current = self.session.as_ref().map(Session::generation);
        if current != Some(event.generation()) {
            debug!(
                generation = event.generation(),
                current = ?current,
                "Ignoring event from a stale session"
            );
            return None;
        }

        match event {
            LinkEvent::Value { data, .. } => self.on_value(&data),
            LinkEvent::SessionLost { .. } => {
                self.on_disconnect();
                None
            }
        }
    }

    /// Wait for the next platform event.
    ///
    /// Cancel safe; pair it with [`handle_event`](Self::handle_event).
    pub async fn next_event(&mut self) -> Option<LinkEvent> {
        self.events_rx.recv().await
    }

    /// Handle every event already queued, returning the rendered readings.
    pub fn process_pending(&mut self) -> Vec<Reading> {
        let mut readings = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(reading) = self.handle_event(event) {
                readings.push(reading);
            }
        }
        readings
    }
}
