//! Integration tests for the session's HID event WebSocket against a local
//! fake device.

mod common;

use std::time::{Duration, Instant};

use common::{full_state_burst, state_frame, FakeDevice, BASIC_ADMIN_PW};
use futures_util::future::join_all;
use pikvm_client::{DeviceTransport, KvmError, Session};
use serde_json::json;

#[tokio::test]
async fn test_event_frame_reaches_device_with_basic_auth() {
    // Arrange
    let mut device = FakeDevice::start(full_state_burst()).await;
    let session = Session::new(device.config()).unwrap();

    // Act
    session
        .send_event("key", json!({"key": "KeyA", "state": true}))
        .await
        .unwrap();

    // Assert
    assert_eq!(
        device.next_frame().await,
        json!({"event_type": "key", "event": {"key": "KeyA", "state": true}})
    );
    assert_eq!(
        device.auth_headers.lock().unwrap().as_slice(),
        [BASIC_ADMIN_PW.to_string()]
    );
}

#[tokio::test]
async fn test_streamer_event_ends_drain_early() {
    let device = FakeDevice::start(full_state_burst()).await;
    let session = Session::new(device.config()).unwrap();
    let started = Instant::now();

    drop(session.ensure_websocket().await.unwrap());

    // Without the `streamer` frame the drain would wait out its 500 ms timeout.
    assert!(started.elapsed() < Duration::from_millis(450));
}

#[tokio::test]
async fn test_quiet_device_is_drained_by_timeout() {
    let mut device = FakeDevice::start(vec![state_frame("gpio")]).await;
    let session = Session::new(device.config()).unwrap();

    session
        .send_event("mouse_wheel", json!({"delta": {"x": 0, "y": -1}}))
        .await
        .unwrap();

    assert_eq!(device.next_frame().await["event_type"], "mouse_wheel");
}

#[tokio::test]
async fn test_concurrent_senders_share_one_connection() {
    // Arrange
    let mut device = FakeDevice::start(full_state_burst()).await;
    let session = Session::new(device.config()).unwrap();

    // Act
    let sends = (0..5).map(|i| session.send_event("mouse_relative", json!({"delta": {"x": i, "y": 0}})));
    for result in join_all(sends).await {
        result.unwrap();
    }

    // Assert
    assert_eq!(device.accepted(), 1);
    for _ in 0..5 {
        assert_eq!(device.next_frame().await["event_type"], "mouse_relative");
    }
}

#[tokio::test]
async fn test_dropped_connection_is_replaced_on_next_event() {
    // Arrange: the device hangs up on the first connection after 100 ms.
    let mut device =
        FakeDevice::start_with(full_state_burst(), Some(Duration::from_millis(100))).await;
    let session = Session::new(device.config()).unwrap();
    session
        .send_event("key", json!({"key": "KeyA", "state": true}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    // Act
    session
        .send_event("key", json!({"key": "KeyA", "state": false}))
        .await
        .unwrap();

    // Assert
    assert_eq!(device.accepted(), 2);
    assert_eq!(
        device.next_frame().await,
        json!({"event_type": "key", "event": {"key": "KeyA", "state": false}})
    );
}

#[tokio::test]
async fn test_close_releases_socket_and_is_idempotent() {
    let device = FakeDevice::start(full_state_burst()).await;
    let session = Session::new(device.config()).unwrap();
    drop(session.ensure_websocket().await.unwrap());

    session.close().await.unwrap();
    session.close().await.unwrap();

    assert!(matches!(
        session
            .send_event("key", json!({"key": "KeyA", "state": true}))
            .await,
        Err(KvmError::NotConnected(_))
    ));
    assert_eq!(device.accepted(), 1);
}

#[tokio::test]
async fn test_unreachable_websocket_is_transport_error() {
    // Bind and immediately drop a listener to get a port nobody listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = pikvm_client::DeviceConfig::new("127.0.0.1")
        .with_port(port)
        .with_scheme(pikvm_client::Scheme::Http);
    let session = Session::new(config).unwrap();

    let result = session.send_event("key", json!({})).await;

    assert!(result.unwrap_err().is_transport());
}
