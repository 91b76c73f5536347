//! Infrastructure layer: everything that touches the network or a thread.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pikvm_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`session`** – The one [`Session`](session::Session) per device: a
//!   shared HTTP client, a cached login token and a lazily opened,
//!   probe-and-reconnect WebSocket for HID events.  Implements
//!   [`DeviceTransport`](crate::application::DeviceTransport).
//!
//! - **`bridge`** – [`ExecutionBridge`](bridge::ExecutionBridge): a worker
//!   thread with its own current-thread Tokio runtime, so that blocking
//!   callers can drive the async session.
//!
//! - **`mock`** – [`RecordingTransport`](mock::RecordingTransport), an
//!   in-memory `DeviceTransport` for tests.

pub mod bridge;
pub mod mock;
pub mod session;
