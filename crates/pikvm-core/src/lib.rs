//! # pikvm-core
//!
//! Shared, I/O-free building blocks for talking to a PiKVM-compatible KVM
//! appliance (GL.iNet Comet and friends).
//!
//! The device exposes two surfaces:
//!
//! - an HTTP API under `/api/...` whose every response is wrapped in the same
//!   JSON envelope (`{"ok": bool, "result": {...}}`), and
//! - a WebSocket at `/api/ws` used for low-latency HID input events.
//!
//! This crate owns the *shape* of both surfaces and nothing else:
//!
//! - **`protocol`** – The response envelope decoder and the JSON event frames
//!   sent over the WebSocket.
//!
//! - **`domain`** – Connection settings, typed input values (mouse buttons,
//!   ATX buttons, MSD drive mode), the firmware pacing constants and the drag
//!   path interpolation.
//!
//! - **`error`** – The error taxonomy shared by every layer above.
//!
//! Networking lives in the `pikvm-client` crate.

pub mod domain;
pub mod error;
pub mod protocol;

pub use domain::config::{ConfigError, DeviceConfig, Scheme};
pub use domain::input::{drag_path, AtxButton, DriveMode, MouseButton, Point};
pub use error::{KvmError, Result};
pub use protocol::envelope::{check_status, decode_envelope, Envelope};
pub use protocol::events::{DeviceEvent, HidEvent};
