//! Hardware integration tests for bioguard-core
//!
//! These tests require a powered analyzer in range and should be run with:
//! ```
//! cargo test --package bioguard-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Set `BIOGUARD_DEVICE` to override the advertised name
//! (defaults to `ESP32-AguaAnalyzer`).

use std::env;
use std::sync::Arc;
use std::time::Duration;

use bioguard_core::mock::RecordingSink;
use bioguard_core::scan::{find_by_name, get_adapter};
use bioguard_core::uuids::DEVICE_NAME;
use bioguard_core::{BleAdapter, DiscoveryFilter, SessionConfig, SessionManager, SessionState};
use tokio::time::timeout;

/// Default timeout for BLE operations
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the device name from environment or use the firmware default.
fn get_device_name() -> String {
    env::var("BIOGUARD_DEVICE")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEVICE_NAME.to_string())
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_finds_analyzer() {
    let adapter = get_adapter().await.expect("no Bluetooth adapter");
    let filter = DiscoveryFilter {
        name: get_device_name(),
        ..DiscoveryFilter::default()
    };

    match timeout(BLE_TIMEOUT, find_by_name(&adapter, &filter)).await {
        Ok(Ok(_peripheral)) => println!("Found {}", filter.name),
        Ok(Err(e)) => panic!("Scan failed: {}", e),
        Err(_) => panic!("Scan timed out after {:?}", BLE_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_connect_receive_and_disconnect() {
    let adapter = Arc::new(BleAdapter::default());
    let config = SessionConfig::default().device_name(get_device_name());
    let mut manager = SessionManager::new(adapter, RecordingSink::new(), config).unwrap();

    timeout(BLE_TIMEOUT, manager.connect())
        .await
        .expect("connect timed out")
        .expect("connect failed");
    assert_eq!(manager.state(), SessionState::Connected);

    // Notifications or the first poll should produce a reading well within this.
    let reading = timeout(BLE_TIMEOUT, async {
        loop {
            let event = manager.next_event().await.expect("event channel closed");
            if let Some(reading) = manager.handle_event(event) {
                break reading;
            }
        }
    })
    .await
    .expect("no reading received");
    println!("Reading: {:?}", reading);

    manager.disconnect().await.expect("disconnect failed");
    timeout(BLE_TIMEOUT, async {
        while manager.state() != SessionState::Idle {
            let event = manager.next_event().await.expect("event channel closed");
            manager.handle_event(event);
        }
    })
    .await
    .expect("session lost was never reported");
}
