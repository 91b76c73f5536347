//! Integration tests for the blocking client: calls made from plain threads
//! are carried out on the execution bridge and their results (or errors)
//! come back to the caller.

mod common;

use std::thread;

use common::{full_state_burst, FakeDevice};
use pikvm_client::{DeviceConfig, KvmClient, KvmError, Point, Scheme, ShutdownOutcome};
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A multi-threaded runtime that keeps the mock servers running while the
/// test thread blocks.
fn server_runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn mock_api(runtime: &Runtime, api_path: &str, response: ResponseTemplate) -> MockServer {
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(api_path))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    })
}

fn config_for(server: &MockServer) -> DeviceConfig {
    DeviceConfig::new("127.0.0.1")
        .with_port(server.address().port())
        .with_scheme(Scheme::Http)
        .with_credentials("admin", "pw")
}

#[test]
fn test_blocking_call_returns_result() {
    // Arrange
    let runtime = server_runtime();
    let server = mock_api(
        &runtime,
        "/api/info",
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"hw": {}}})),
    );
    let kvm = KvmClient::new(config_for(&server)).unwrap();

    // Act
    let info = kvm.info().unwrap();

    // Assert
    assert_eq!(info, json!({"hw": {}}));
}

#[test]
fn test_blocking_call_reraises_device_error() {
    let runtime = server_runtime();
    let server = mock_api(&runtime, "/api/atx", ResponseTemplate::new(401));
    let kvm = KvmClient::new(config_for(&server)).unwrap();

    let error = kvm.atx().status().unwrap_err();

    assert!(error.is_auth());
}

#[test]
fn test_blocking_keyboard_reaches_device() {
    // Arrange
    let runtime = server_runtime();
    let mut device = runtime.block_on(FakeDevice::start(full_state_burst()));
    let kvm = KvmClient::new(device.config()).unwrap();

    // Act
    kvm.keyboard().press("Enter").unwrap();

    // Assert
    let frames = runtime.block_on(async { [device.next_frame().await, device.next_frame().await] });
    assert_eq!(
        frames,
        [
            json!({"event_type": "key", "event": {"key": "Enter", "state": true}}),
            json!({"event_type": "key", "event": {"key": "Enter", "state": false}}),
        ]
    );
}

#[test]
fn test_threads_share_one_websocket() {
    let runtime = server_runtime();
    let device = runtime.block_on(FakeDevice::start(full_state_burst()));
    let kvm = KvmClient::new(device.config()).unwrap();

    thread::scope(|scope| {
        for i in 0..4 {
            let kvm = &kvm;
            scope.spawn(move || kvm.mouse().move_to(i * 10, i * 10).unwrap());
        }
    });
    kvm.mouse().click(Some(Point::new(5, 5)), Default::default()).unwrap();

    assert_eq!(device.accepted(), 1);
}

#[test]
fn test_close_is_idempotent_and_final() {
    // Arrange
    let runtime = server_runtime();
    let server = mock_api(
        &runtime,
        "/api/info",
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})),
    );
    let kvm = KvmClient::new(config_for(&server)).unwrap();

    // Act
    let first = kvm.close().unwrap();
    let second = kvm.close().unwrap();

    // Assert
    assert_eq!(first, ShutdownOutcome::Joined);
    assert_eq!(second, ShutdownOutcome::AlreadyStopped);
    assert!(matches!(kvm.info(), Err(KvmError::BridgeStopped)));
}

#[test]
fn test_drop_closes_without_hanging() {
    let runtime = server_runtime();
    let device = runtime.block_on(FakeDevice::start(full_state_burst()));

    {
        let kvm = KvmClient::new(device.config()).unwrap();
        kvm.mouse().scroll(0, 3).unwrap();
    }

    assert_eq!(device.accepted(), 1);
}

#[test]
fn test_drop_inside_runtime_stops_worker_without_panicking() {
    // Arrange
    let runtime = server_runtime();
    let device = runtime.block_on(FakeDevice::start(full_state_burst()));
    let kvm = KvmClient::new(device.config()).unwrap();
    kvm.mouse().scroll(0, 3).unwrap();

    // Act: the implicit close cannot block on a runtime thread.
    runtime.block_on(async move { drop(kvm) });

    // Assert
    assert_eq!(device.accepted(), 1);
}
