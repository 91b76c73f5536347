//! Application layer: the device capabilities a caller actually uses.
//!
//! # What lives here?
//!
//! - **`keyboard`** – Key presses, shortcuts and text injection.
//! - **`mouse`** – Pointer moves, clicks, scrolling and interpolated drags.
//! - **`video`** – Screenshots and streamer state.
//! - **`msd`** – Mass-storage (virtual media): upload, select, attach, remove.
//! - **`atx`** – Power and reset buttons of the target machine.
//!
//! Every façade is a thin, non-owning view over a [`DeviceTransport`].  It
//! turns a typed call into one or more HTTP requests or WebSocket events and
//! applies the pacing delays the firmware expects.  The façades never open
//! sockets themselves, which is why they can be exercised in tests against
//! [`RecordingTransport`](crate::infrastructure::mock::RecordingTransport) or
//! a `mockall` mock with no device on the network.

use async_trait::async_trait;
use pikvm_core::{HidEvent, Result};
use serde_json::Value;

pub mod atx;
pub mod keyboard;
pub mod mouse;
pub mod msd;
pub mod video;

pub use atx::Atx;
pub use keyboard::Keyboard;
pub use mouse::Mouse;
pub use msd::Msd;
pub use video::Video;

/// Query parameters of an API call, in the order they are sent.
pub type Query = Vec<(&'static str, String)>;

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Literal text (`hid/print`).
    Text(String),
    /// Raw bytes sent as `application/octet-stream` (`msd/write`).
    Octets(Vec<u8>),
}

/// Everything a façade needs from the device connection.
///
/// `path` is relative to `/api/` (e.g. `"msd/set_params"`).  HTTP methods
/// return the decoded `result` payload of the response envelope.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// GET `path` and decode the envelope.
    async fn get(&self, path: &str, query: Query) -> Result<Value>;

    /// POST `path` with `body` and decode the envelope.
    async fn post(&self, path: &str, query: Query, body: RequestBody) -> Result<Value>;

    /// GET `path` and return the raw response bytes (no envelope).
    async fn get_bytes(&self, path: &str, query: Query) -> Result<Vec<u8>>;

    /// Send one `{"event_type": ..., "event": ...}` frame over the WebSocket.
    async fn send_event(&self, event_type: &str, event: Value) -> Result<()>;
}

/// Sends a typed HID event through `transport`.
pub(crate) async fn send_hid<T>(transport: &T, event: HidEvent) -> Result<()>
where
    T: DeviceTransport + ?Sized,
{
    transport.send_event(event.event_type(), event.payload()).await
}
