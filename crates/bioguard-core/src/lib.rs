//! BLE session library for the Bio-Guard water analyzer.
//!
//! This crate connects to the analyzer's ESP32 over Bluetooth Low Energy,
//! receives its reading notifications, polls the reading characteristic on a
//! fixed period, and renders every decoded reading into a
//! [`PresentationSink`] supplied by the front end.
//!
//! # Features
//!
//! - **Session management**: one connect sequence, one teardown path
//! - **Notifications and polling**: both deliver values through the same channel
//! - **Decoding**: the delimited reading text becomes a contamination gauge
//! - **Pluggable backends**: btleplug for hardware, [`mock`] for tests
//!
//! # Architecture
//!
//! Backends never call back into the manager. They push [`LinkEvent`]s
//! stamped with the session generation onto a channel, and whoever drives
//! the [`SessionManager`] feeds them to [`SessionManager::handle_event`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bioguard_core::{BleAdapter, SessionConfig, SessionManager, SessionState};
//! # use bioguard_core::mock::RecordingSink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Arc::new(BleAdapter::default());
//!     let mut manager =
//!         SessionManager::new(adapter, RecordingSink::new(), SessionConfig::default())?;
//!
//!     manager.connect().await?;
//!     while manager.state() == SessionState::Connected {
//!         let Some(event) = manager.next_event().await else { break };
//!         if let Some(reading) = manager.handle_event(event) {
//!             println!("{}: {}", reading.contamination_label, reading.light_label);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod decoder;
pub mod device;
pub mod error;
pub mod events;
pub mod mock;
pub mod poller;
pub mod scan;
pub mod session;
pub mod sink;
pub mod traits;

// Core exports
pub use device::{BleAdapter, BlePeripheral, LinkConfig};
pub use error::{ConnectStep, Error, Result};
pub use events::{EventReceiver, EventSender, LinkEvent, SessionEvents, SessionGeneration};
pub use poller::{DEFAULT_POLL_INTERVAL, Poller};
pub use session::{Session, SessionConfig, SessionManager, SessionState};
pub use sink::{PresentationSink, StatusKind, TriggerAction, TriggerControl};
pub use traits::{
    CharacteristicHandle, DiscoveryFilter, SensorAdapter, SensorPeripheral, ServiceHandle,
};

// Re-export from bioguard-types
pub use bioguard_types::uuid as uuids;
pub use bioguard_types::{ContaminationLevel, DecodeWarning, Reading, StyleBucket};
