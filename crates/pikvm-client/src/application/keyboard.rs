//! Keyboard façade.
//!
//! Keys are named the way browsers name them in `KeyboardEvent.code`
//! (`"KeyA"`, `"Enter"`, `"ControlLeft"`, `"F12"`).  Single key events travel
//! over the WebSocket; whole strings go through the `hid/print` endpoint,
//! which types them server-side using the given keymap.

use pikvm_core::domain::pacing::{KEY_STROKE_GAP, SHORTCUT_HOLD};
use pikvm_core::{HidEvent, Result};
use tokio::time::sleep;
use tracing::debug;

use super::{send_hid, DeviceTransport, RequestBody};

pub struct Keyboard<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: DeviceTransport + ?Sized> Keyboard<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Presses and releases `key`, with [`KEY_STROKE_GAP`] in between.
    pub async fn press(&self, key: &str) -> Result<()> {
        self.hold(key).await?;
        sleep(KEY_STROKE_GAP).await;
        self.release(key).await
    }

    /// Sends key-down only.
    pub async fn hold(&self, key: &str) -> Result<()> {
        send_hid(self.transport, HidEvent::key(key, true)).await
    }

    /// Sends key-up only.
    pub async fn release(&self, key: &str) -> Result<()> {
        send_hid(self.transport, HidEvent::key(key, false)).await
    }

    /// Presses a key combination such as `["ControlLeft", "AltLeft", "Delete"]`.
    ///
    /// Keys go down in the given order and come up in reverse, each event
    /// followed by [`KEY_STROKE_GAP`], with [`SHORTCUT_HOLD`] while all of them
    /// are held.  The first failing event aborts the sequence; keys already
    /// pressed are not released.
    pub async fn shortcut(&self, keys: &[&str]) -> Result<()> {
        debug!(?keys, "sending shortcut");
        for key in keys {
            self.hold(key).await?;
            sleep(KEY_STROKE_GAP).await;
        }
        sleep(SHORTCUT_HOLD).await;
        for key in keys.iter().rev() {
            self.release(key).await?;
            sleep(KEY_STROKE_GAP).await;
        }
        Ok(())
    }

    /// Types `text` on the target using the device-side `keymap`
    /// (e.g. [`DEFAULT_KEYMAP`](pikvm_core::domain::pacing::DEFAULT_KEYMAP)).
    pub async fn type_text(&self, text: &str, keymap: &str) -> Result<()> {
        debug!(chars = text.chars().count(), keymap, "typing text");
        self.transport
            .post(
                "hid/print",
                vec![("limit", "0".to_string()), ("keymap", keymap.to_string())],
                RequestBody::Text(text.to_string()),
            )
            .await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::mock::{RecordedCall, RecordingTransport};

    #[tokio::test(start_paused = true)]
    async fn test_press_sends_down_then_up_after_gap() {
        // Arrange
        let transport = RecordingTransport::new();

        // Act
        Keyboard::new(&transport).press("KeyA").await.unwrap();

        // Assert
        assert_eq!(
            transport.hid_events(),
            vec![HidEvent::key("KeyA", true), HidEvent::key("KeyA", false)]
        );
        assert_eq!(transport.gaps(), vec![Duration::from_millis(20)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_releases_in_reverse_order() {
        let transport = RecordingTransport::new();

        Keyboard::new(&transport)
            .shortcut(&["ControlLeft", "AltLeft", "Delete"])
            .await
            .unwrap();

        assert_eq!(
            transport.hid_events(),
            vec![
                HidEvent::key("ControlLeft", true),
                HidEvent::key("AltLeft", true),
                HidEvent::key("Delete", true),
                HidEvent::key("Delete", false),
                HidEvent::key("AltLeft", false),
                HidEvent::key("ControlLeft", false),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_holds_keys_before_release() {
        let transport = RecordingTransport::new();

        Keyboard::new(&transport)
            .shortcut(&["ShiftLeft", "KeyA"])
            .await
            .unwrap();

        // down, 20ms, down, 20ms + 50ms hold, up, 20ms, up
        assert_eq!(
            transport.gaps(),
            vec![
                Duration::from_millis(20),
                Duration::from_millis(70),
                Duration::from_millis(20),
            ]
        );
    }

    #[tokio::test]
    async fn test_shortcut_stops_at_first_failure() {
        let transport = RecordingTransport::failing();

        let result = Keyboard::new(&transport).shortcut(&["ControlLeft", "KeyC"]).await;

        assert!(result.is_err());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_type_text_posts_literal_body_with_keymap() {
        let transport = RecordingTransport::new();

        Keyboard::new(&transport)
            .type_text("Hello, world!", "de")
            .await
            .unwrap();

        assert_eq!(
            transport.calls(),
            vec![RecordedCall::Post {
                path: "hid/print".to_string(),
                query: vec![("limit", "0".to_string()), ("keymap", "de".to_string())],
                body: RequestBody::Text("Hello, world!".to_string()),
            }]
        );
    }
}
