//! JSON frames exchanged on the device WebSocket (`/api/ws`).
//!
//! # Client → device
//!
//! Every frame is an object with an `event_type` discriminant and an `event`
//! payload:
//!
//! ```json
//! {"event_type": "key",          "event": {"key": "KeyA", "state": true}}
//! {"event_type": "mouse_move",   "event": {"to": {"x": 100, "y": 200}}}
//! {"event_type": "mouse_button", "event": {"button": "left", "state": false}}
//! {"event_type": "mouse_wheel",  "event": {"delta": {"x": 0, "y": -5}}}
//! {"event_type": "mouse_relative","event": {"delta": {"x": 3, "y": 4}}}
//! ```
//!
//! Serde's adjacently tagged representation
//! (`#[serde(tag = "event_type", content = "event")]`) produces exactly this
//! shape from [`HidEvent`].
//!
//! # Device → client
//!
//! Right after the connection is opened the device pushes a burst of state
//! frames (`gpio`, `hid`, `atx`, `msd`, ..., typically ending with
//! `streamer`).  [`DeviceEvent`] is a lenient view over those frames: only the
//! discriminant is interpreted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::input::{MouseButton, Point};

/// Event type the device pushes last in its initial state burst.
pub const STREAMER_EVENT_TYPE: &str = "streamer";

/// An input event sent to the device over the WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "event", rename_all = "snake_case")]
pub enum HidEvent {
    /// Key down (`state == true`) or key up, by web key name (`"KeyA"`,
    /// `"Enter"`, `"ControlLeft"`).
    Key { key: String, state: bool },
    /// Absolute pointer position.
    MouseMove { to: Point },
    /// Button down (`state == true`) or button up.
    MouseButton { button: MouseButton, state: bool },
    /// Wheel scroll; negative `y` scrolls up.
    MouseWheel { delta: Point },
    /// Relative pointer motion.
    MouseRelative { delta: Point },
}

impl HidEvent {
    /// Builds a key-down or key-up event.
    pub fn key(key: &str, state: bool) -> Self {
        Self::Key {
            key: key.to_string(),
            state,
        }
    }

    /// The `event_type` discriminant written on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::MouseMove { .. } => "mouse_move",
            Self::MouseButton { .. } => "mouse_button",
            Self::MouseWheel { .. } => "mouse_wheel",
            Self::MouseRelative { .. } => "mouse_relative",
        }
    }

    /// The `event` payload written on the wire.
    pub fn payload(&self) -> Value {
        match self {
            Self::Key { key, state } => json!({ "key": key, "state": state }),
            Self::MouseMove { to } => json!({ "to": to }),
            Self::MouseButton { button, state } => json!({ "button": button, "state": state }),
            Self::MouseWheel { delta } | Self::MouseRelative { delta } => json!({ "delta": delta }),
        }
    }

    /// Rebuilds a typed event from a raw `(event_type, event)` pair.
    ///
    /// Returns `None` for event types this crate does not model.
    pub fn from_parts(event_type: &str, event: &Value) -> Option<Self> {
        serde_json::from_value(json!({ "event_type": event_type, "event": event })).ok()
    }
}

/// Serializes a raw `(event_type, event)` pair into a WebSocket text frame.
pub fn encode_frame(event_type: &str, event: &Value) -> String {
    json!({ "event_type": event_type, "event": event }).to_string()
}

/// A state frame pushed by the device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceEvent {
    /// Discriminant, e.g. `"streamer"`, `"atx"`, `"hid"`.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Free-form payload; not interpreted by the client.
    #[serde(default)]
    pub event: Value,
}

impl DeviceEvent {
    /// Parses a text frame; `None` if it is not a JSON object.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Whether this is the `streamer` frame that closes the initial burst.
    pub fn is_streamer(&self) -> bool {
        self.event_type.as_deref() == Some(STREAMER_EVENT_TYPE)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
