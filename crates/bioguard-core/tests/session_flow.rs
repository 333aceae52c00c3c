//! Session lifecycle tests against the mock backend.
//!
//! Run with: `cargo test --package bioguard-core --test session_flow`

use std::sync::Arc;
use std::time::Duration;

use bioguard_core::mock::{MockAdapter, MockPeripheral, RecordingSink, SinkCall};
use bioguard_core::sink::{
    ALERT_UNSUPPORTED, STATUS_CONNECTED, STATUS_DISCONNECTED, STATUS_SEARCHING,
};
use bioguard_core::{
    ConnectStep, Error, SessionConfig, SessionManager, SessionState, StatusKind, StyleBucket,
    TriggerControl,
};
use tokio::time::sleep;

const VERY_DARK: &str = "Cor: Vermelho | Contaminação: Muito Escuro | Intensidade Luz: 45%";
const NORMAL: &str = "Cor: Azul | Contaminação: Normal | Intensidade Luz: 10%";

struct Harness {
    peripheral: Arc<MockPeripheral>,
    adapter: Arc<MockAdapter>,
    manager: SessionManager<RecordingSink>,
}

fn harness() -> Harness {
    let peripheral = Arc::new(MockPeripheral::analyzer());
    let adapter = Arc::new(MockAdapter::new(Arc::clone(&peripheral)));
    let manager = SessionManager::new(
        Arc::clone(&adapter) as Arc<dyn bioguard_core::SensorAdapter>,
        RecordingSink::new(),
        SessionConfig::default(),
    )
    .unwrap();
    Harness {
        peripheral,
        adapter,
        manager,
    }
}

/// Let spawned poll reads run to completion.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Connect
// =============================================================================

#[tokio::test]
async fn test_connect_success_sequence() {
    let mut h = harness();

    h.manager.connect().await.unwrap();

    assert_eq!(h.manager.state(), SessionState::Connected);
    assert!(h.manager.is_connected());
    assert!(h.peripheral.is_connected_sync());
    assert_eq!(
        h.manager.sink().calls(),
        &[
            SinkCall::Trigger(TriggerControl::connecting()),
            SinkCall::Status {
                message: STATUS_SEARCHING.to_string(),
                kind: StatusKind::Disconnected,
            },
            SinkCall::Status {
                message: "Conectando ao ESP32-AguaAnalyzer...".to_string(),
                kind: StatusKind::Disconnected,
            },
            SinkCall::Trigger(TriggerControl::disconnect()),
            SinkCall::Status {
                message: STATUS_CONNECTED.to_string(),
                kind: StatusKind::Connected,
            },
        ]
    );
}

#[tokio::test]
async fn test_each_failed_step_resets_to_idle() {
    let steps = [
        ConnectStep::RequestDevice,
        ConnectStep::WatchDisconnect,
        ConnectStep::Connect,
        ConnectStep::PrimaryService,
        ConnectStep::Characteristic,
        ConnectStep::StartNotifications,
        ConnectStep::Subscribe,
    ];

    for step in steps {
        let mut h = harness();
        h.peripheral.fail_at(Some(step));

        let err = h.manager.connect().await.unwrap_err();

        assert!(err.is_discovery_failure(), "step {step:?}: {err}");
        assert_eq!(err.failed_step(), Some(step));
        assert_eq!(h.manager.state(), SessionState::Idle);
        assert!(h.manager.session().is_none());
        assert_eq!(h.manager.sink().trigger(), Some(&TriggerControl::connect()));

        let (message, kind) = h.manager.sink().status().unwrap();
        assert_eq!(message, format!("Erro na conexão: {}", err.reason()));
        assert_eq!(kind, StatusKind::Disconnected);
    }
}

#[tokio::test]
async fn test_wrong_device_name_is_not_found() {
    let peripheral = Arc::new(MockPeripheral::new("ESP32-Outro"));
    let adapter = Arc::new(MockAdapter::new(peripheral));
    let mut manager =
        SessionManager::new(adapter, RecordingSink::new(), SessionConfig::default()).unwrap();

    let err = manager.connect().await.unwrap_err();

    assert_eq!(err.failed_step(), Some(ConnectStep::RequestDevice));
    assert!(err.reason().contains("ESP32-AguaAnalyzer"));
}

#[tokio::test]
async fn test_capability_unavailable_raises_alert() {
    let mut h = harness();
    h.adapter.set_available(false);

    let err = h.manager.connect().await.unwrap_err();

    assert!(err.is_capability_unavailable());
    assert_eq!(h.manager.state(), SessionState::Idle);
    assert_eq!(h.manager.sink().alerts(), vec![ALERT_UNSUPPORTED]);
    assert_eq!(
        h.manager.sink().calls(),
        &[SinkCall::Alert(ALERT_UNSUPPORTED.to_string())]
    );
    assert_eq!(h.adapter.request_count(), 0);
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let mut h = harness();
    h.peripheral.fail_at(Some(ConnectStep::Characteristic));
    assert!(h.manager.connect().await.is_err());

    h.peripheral.fail_at(None);
    h.manager.connect().await.unwrap();

    assert_eq!(h.manager.state(), SessionState::Connected);
    assert_eq!(h.manager.session().map(|s| s.generation()), Some(2));
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notification_is_rendered() {
    let mut h = harness();
    h.manager.connect().await.unwrap();
    h.manager.sink_mut().clear_calls();

    assert!(h.peripheral.notify(VERY_DARK.as_bytes().to_vec()));
    let event = h.manager.next_event().await.unwrap();
    let reading = h.manager.handle_event(event).unwrap();

    assert_eq!(reading.light_label, "45%");
    assert_eq!(h.manager.sink().fill_height(), Some(100));
    assert_eq!(h.manager.sink().bucket(), Some(StyleBucket::Alta));
    assert_eq!(h.manager.sink().light_text(), Some("45%"));
}

#[tokio::test]
async fn test_malformed_notification_keeps_session() {
    let mut h = harness();
    h.manager.connect().await.unwrap();
    h.manager.sink_mut().clear_calls();

    h.peripheral.notify(b"only one segment".to_vec());
    let readings = h.manager.process_pending();

    assert!(readings.is_empty());
    assert!(h.manager.sink().calls().is_empty());
    assert_eq!(h.manager.state(), SessionState::Connected);
}

// =============================================================================
// Disconnect
// =============================================================================

#[tokio::test]
async fn test_user_disconnect_uses_session_lost_path() {
    let mut h = harness();
    h.manager.connect().await.unwrap();

    h.manager.disconnect().await.unwrap();
    // Nothing changes until the platform reports the loss.
    assert_eq!(h.manager.state(), SessionState::Connected);

    let event = h.manager.next_event().await.unwrap();
    h.manager.handle_event(event);

    assert_eq!(h.peripheral.disconnect_count(), 1);
    assert_eq!(h.manager.state(), SessionState::Idle);
    assert!(h.manager.session().is_none());
    assert_eq!(h.manager.sink().trigger(), Some(&TriggerControl::connect()));
    assert_eq!(
        h.manager.sink().status(),
        Some((STATUS_DISCONNECTED, StatusKind::Disconnected))
    );
}

#[tokio::test]
async fn test_peer_drop_tears_down_without_reconnect() {
    let mut h = harness();
    h.manager.connect().await.unwrap();

    h.peripheral.drop_link();
    h.manager.process_pending();

    assert_eq!(h.manager.state(), SessionState::Idle);
    assert_eq!(h.adapter.request_count(), 1);
    assert_eq!(h.peripheral.disconnect_count(), 0);
}

#[tokio::test]
async fn test_disconnect_callback_twice_is_idempotent() {
    let mut h = harness();
    h.manager.connect().await.unwrap();

    h.manager.on_disconnect();
    let state_once = h.manager.state();
    let status_once = h.manager.sink().status().map(|(m, k)| (m.to_string(), k));
    let trigger_once = h.manager.sink().trigger().cloned();

    h.manager.on_disconnect();

    assert_eq!(h.manager.state(), state_once);
    assert_eq!(
        h.manager.sink().status().map(|(m, k)| (m.to_string(), k)),
        status_once
    );
    assert_eq!(h.manager.sink().trigger().cloned(), trigger_once);
    assert!(h.manager.session().is_none());
}

#[tokio::test]
async fn test_stale_session_lost_is_ignored() {
    let mut h = harness();
    // The first attempt registers its disconnect watcher, then fails.
    h.peripheral.fail_at(Some(ConnectStep::StartNotifications));
    assert!(h.manager.connect().await.is_err());
    h.peripheral.drop_link();

    h.peripheral.fail_at(None);
    h.manager.connect().await.unwrap();
    h.manager.process_pending();

    assert_eq!(h.manager.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_disconnect_when_idle_is_noop() {
    let mut h = harness();
    h.manager.disconnect().await.unwrap();
    assert_eq!(h.peripheral.disconnect_count(), 0);
    assert!(matches!(h.manager.state(), SessionState::Idle));
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_reads_every_period() {
    let mut h = harness();
    h.peripheral.set_value(NORMAL);
    h.manager.connect().await.unwrap();

    sleep(Duration::from_millis(1999)).await;
    settle().await;
    assert_eq!(h.peripheral.read_count(), 0);

    sleep(Duration::from_millis(2)).await;
    settle().await;
    assert_eq!(h.peripheral.read_count(), 1);

    let readings = h.manager.process_pending();
    assert_eq!(readings.len(), 1);
    assert_eq!(h.manager.sink().fill_height(), Some(66));
    assert_eq!(h.manager.sink().bucket(), Some(StyleBucket::Media));

    sleep(Duration::from_millis(4000)).await;
    settle().await;
    assert_eq!(h.peripheral.read_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_read_failure_does_not_stop_polling() {
    let mut h = harness();
    h.manager.connect().await.unwrap();
    h.peripheral.set_fail_reads(true);

    sleep(Duration::from_millis(4001)).await;
    settle().await;
    assert_eq!(h.peripheral.read_count(), 2);
    assert!(h.manager.process_pending().is_empty());
    assert_eq!(h.manager.state(), SessionState::Connected);

    h.peripheral.set_fail_reads(false);
    sleep(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(h.manager.process_pending().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_after_disconnect() {
    let mut h = harness();
    h.manager.connect().await.unwrap();
    assert!(h.manager.session().unwrap().is_polling());

    h.manager.disconnect().await.unwrap();
    h.manager.process_pending();
    assert!(h.manager.session().is_none());

    sleep(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(h.peripheral.read_count(), 0);
}

#[tokio::test]
async fn test_connect_twice_is_invalid_state() {
    let mut h = harness();
    h.manager.connect().await.unwrap();
    let err = h.manager.connect().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}
