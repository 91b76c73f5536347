//! Recording transport for unit testing the façades.
//!
//! # Why a recording transport?
//!
//! The real [`Session`](super::session::Session) needs a device (or at least a
//! local HTTP and WebSocket server) to talk to.  `RecordingTransport` keeps
//! every call in memory, in order, together with the Tokio clock reading at
//! the time of the call.  Under `#[tokio::test(start_paused = true)]` the
//! clock only advances through `sleep`, so [`gaps`](RecordingTransport::gaps)
//! shows exactly the pacing delays a façade inserted.
//!
//! # Usage in tests
//!
//! ```ignore
//! let transport = RecordingTransport::new();
//! Keyboard::new(&transport).press("KeyA").await?;
//!
//! assert_eq!(transport.hid_events(), vec![
//!     HidEvent::key("KeyA", true),
//!     HidEvent::key("KeyA", false),
//! ]);
//! ```
//!
//! # Failing transport
//!
//! [`RecordingTransport::failing`] records each call and then rejects it with
//! a transport error, to test that a sequence stops at the first failure.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use pikvm_core::{HidEvent, KvmError, Result};
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::application::{DeviceTransport, Query, RequestBody};

/// One call made through the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get { path: String, query: Query },
    Post { path: String, query: Query, body: RequestBody },
    GetBytes { path: String, query: Query },
    Event { event_type: String, event: Value },
}

/// A transport that records calls instead of performing them.
pub struct RecordingTransport {
    calls: Mutex<Vec<(Instant, RecordedCall)>>,
    /// Payload returned by `get` and `post`.
    response: Value,
    /// Bytes returned by `get_bytes`.
    bytes: Vec<u8>,
    /// When `true`, every call is recorded and then fails.
    pub should_fail: bool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: Value::Object(Map::new()),
            bytes: Vec::new(),
            should_fail: false,
        }
    }
}

impl RecordingTransport {
    /// Answers every HTTP call with `{}`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every `get`/`post` with `response`.
    pub fn with_response(response: Value) -> Self {
        Self {
            response,
            ..Self::default()
        }
    }

    /// Answers every `get_bytes` with `bytes`.
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    /// Records every call and then fails it.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().iter().map(|(_, call)| call.clone()).collect()
    }

    /// The WebSocket events sent so far, decoded back into typed events.
    ///
    /// Events of a type [`HidEvent`] does not model are skipped.
    pub fn hid_events(&self) -> Vec<HidEvent> {
        self.lock()
            .iter()
            .filter_map(|(_, call)| match call {
                RecordedCall::Event { event_type, event } => HidEvent::from_parts(event_type, event),
                _ => None,
            })
            .collect()
    }

    /// Clock time elapsed between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.lock();
        calls
            .windows(2)
            .map(|pair| pair[1].0.duration_since(pair[0].0))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Instant, RecordedCall)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: RecordedCall) -> Result<()> {
        self.lock().push((Instant::now(), call));
        if self.should_fail {
            return Err(KvmError::transport(
                "recording transport",
                "mock failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceTransport for RecordingTransport {
    async fn get(&self, path: &str, query: Query) -> Result<Value> {
        self.record(RecordedCall::Get {
            path: path.to_string(),
            query,
        })?;
        Ok(self.response.clone())
    }

    async fn post(&self, path: &str, query: Query, body: RequestBody) -> Result<Value> {
        self.record(RecordedCall::Post {
            path: path.to_string(),
            query,
            body,
        })?;
        Ok(self.response.clone())
    }

    async fn get_bytes(&self, path: &str, query: Query) -> Result<Vec<u8>> {
        self.record(RecordedCall::GetBytes {
            path: path.to_string(),
            query,
        })?;
        Ok(self.bytes.clone())
    }

    async fn send_event(&self, event_type: &str, event: Value) -> Result<()> {
        self.record(RecordedCall::Event {
            event_type: event_type.to_string(),
            event,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let transport = RecordingTransport::new();

        transport.get("info", Vec::new()).await.unwrap();
        transport
            .send_event("key", json!({"key": "KeyA", "state": true}))
            .await
            .unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                RecordedCall::Get {
                    path: "info".to_string(),
                    query: Vec::new()
                },
                RecordedCall::Event {
                    event_type: "key".to_string(),
                    event: json!({"key": "KeyA", "state": true}),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_transport_still_records() {
        let transport = RecordingTransport::failing();

        let result = transport.get_bytes("streamer/snapshot", Vec::new()).await;

        let error = tokio_test::assert_err!(result);
        assert!(error.is_transport());
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_with_bytes_answers_get_bytes() {
        let transport = RecordingTransport::with_bytes(vec![1, 2, 3]);

        let bytes = tokio_test::block_on(transport.get_bytes("streamer/snapshot", Vec::new()));

        assert_eq!(tokio_test::assert_ok!(bytes), vec![1, 2, 3]);
    }
}
