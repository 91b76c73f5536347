//! Wire shapes of the device's HTTP and WebSocket APIs.
//!
//! - [`envelope`] – the `{"ok", "result"}` wrapper around every HTTP response.
//! - [`events`] – the `{"event_type", "event"}` frames exchanged on `/api/ws`.

pub mod envelope;
pub mod events;
