//! Blocking client for callers without an async runtime.
//!
//! [`KvmClient`] mirrors [`AsyncKvmClient`] one to one.  Every call is handed
//! to an [`ExecutionBridge`] worker that owns the async client, and the
//! caller's thread blocks until the result comes back.  Errors are returned on
//! the calling thread exactly as the async client produced them.
//!
//! Calls must not be made from inside an async runtime; use
//! [`AsyncKvmClient`] there.

use std::path::{Path, PathBuf};

use pikvm_core::domain::pacing::{DEFAULT_DRAG_STEPS, DEFAULT_KEYMAP};
use pikvm_core::{AtxButton, DeviceConfig, DriveMode, MouseButton, Point, Result};
use serde_json::Value;
use tracing::warn;

use crate::client::AsyncKvmClient;
use crate::infrastructure::bridge::{ExecutionBridge, ShutdownOutcome, DEFAULT_JOIN_TIMEOUT};

type Bridge = ExecutionBridge<AsyncKvmClient>;

/// Blocking client for one device.  Closes itself when dropped.
///
/// Dropped inside an async runtime it cannot wait for the session close, so
/// it only stops the worker; the socket is torn down with the worker's
/// runtime.
pub struct KvmClient {
    bridge: Bridge,
}

impl KvmClient {
    /// Starts the bridge worker and creates the async client on it.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let bridge = ExecutionBridge::start("pikvm-bridge", move || AsyncKvmClient::new(config))?;
        Ok(Self { bridge })
    }

    pub fn keyboard(&self) -> BlockingKeyboard<'_> {
        BlockingKeyboard {
            bridge: &self.bridge,
        }
    }

    pub fn mouse(&self) -> BlockingMouse<'_> {
        BlockingMouse {
            bridge: &self.bridge,
        }
    }

    pub fn video(&self) -> BlockingVideo<'_> {
        BlockingVideo {
            bridge: &self.bridge,
        }
    }

    pub fn msd(&self) -> BlockingMsd<'_> {
        BlockingMsd {
            bridge: &self.bridge,
        }
    }

    pub fn atx(&self) -> BlockingAtx<'_> {
        BlockingAtx {
            bridge: &self.bridge,
        }
    }

    pub fn info(&self) -> Result<Value> {
        self.bridge.submit(|kvm| async move { kvm.info().await })
    }

    pub fn streamer_info(&self) -> Result<Value> {
        self.video().streamer_info()
    }

    pub fn screenshot(&self, save_to: Option<&Path>) -> Result<Vec<u8>> {
        self.video().screenshot(save_to)
    }

    pub fn token(&self) -> Result<String> {
        self.bridge.submit(|kvm| async move { kvm.token().await })
    }

    /// Closes the session, then stops the worker.
    ///
    /// Idempotent: later calls return `Ok(ShutdownOutcome::AlreadyStopped)`.
    /// A [`ShutdownOutcome::TimedOut`] worker has been detached and logged.
    ///
    /// # Errors
    ///
    /// The session close failure, if any.  The worker is stopped regardless.
    pub fn close(&self) -> Result<ShutdownOutcome> {
        if !self.bridge.is_running() {
            return Ok(ShutdownOutcome::AlreadyStopped);
        }
        let closed = self.bridge.submit(|kvm| async move { kvm.close().await });
        let outcome = self.bridge.shutdown(DEFAULT_JOIN_TIMEOUT);
        closed.map(|()| outcome)
    }
}

impl Drop for KvmClient {
    fn drop(&mut self) {
        if tokio::runtime::Handle::try_current().is_ok() {
            warn!("KVM client dropped inside an async runtime; skipping session close");
            self.bridge.shutdown(DEFAULT_JOIN_TIMEOUT);
            return;
        }
        if let Err(e) = self.close() {
            warn!(error = %e, "closing KVM client on drop failed");
        }
    }
}

// ── Façades ───────────────────────────────────────────────────────────────────

/// Blocking [`Keyboard`](crate::application::Keyboard).
pub struct BlockingKeyboard<'a> {
    bridge: &'a Bridge,
}

impl BlockingKeyboard<'_> {
    pub fn press(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.bridge
            .submit(move |kvm| async move { kvm.keyboard().press(&key).await })
    }

    pub fn hold(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.bridge
            .submit(move |kvm| async move { kvm.keyboard().hold(&key).await })
    }

    pub fn release(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.bridge
            .submit(move |kvm| async move { kvm.keyboard().release(&key).await })
    }

    pub fn shortcut(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        self.bridge.submit(move |kvm| async move {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            kvm.keyboard().shortcut(&keys).await
        })
    }

    pub fn type_text(&self, text: &str, keymap: &str) -> Result<()> {
        let text = text.to_string();
        let keymap = keymap.to_string();
        self.bridge
            .submit(move |kvm| async move { kvm.keyboard().type_text(&text, &keymap).await })
    }

    /// [`type_text`](Self::type_text) with the default keymap.
    pub fn type_default(&self, text: &str) -> Result<()> {
        self.type_text(text, DEFAULT_KEYMAP)
    }
}

/// Blocking [`Mouse`](crate::application::Mouse).
pub struct BlockingMouse<'a> {
    bridge: &'a Bridge,
}

impl BlockingMouse<'_> {
    pub fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.bridge
            .submit(move |kvm| async move { kvm.mouse().move_to(x, y).await })
    }

    pub fn click(&self, at: Option<Point>, button: MouseButton) -> Result<()> {
        self.bridge
            .submit(move |kvm| async move { kvm.mouse().click(at, button).await })
    }

    pub fn right_click(&self, at: Option<Point>) -> Result<()> {
        self.click(at, MouseButton::Right)
    }

    pub fn middle_click(&self, at: Option<Point>) -> Result<()> {
        self.click(at, MouseButton::Middle)
    }

    pub fn double_click(&self, at: Option<Point>) -> Result<()> {
        self.bridge
            .submit(move |kvm| async move { kvm.mouse().double_click(at).await })
    }

    pub fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        self.bridge
            .submit(move |kvm| async move { kvm.mouse().scroll(dx, dy).await })
    }

    pub fn drag(&self, from: Point, to: Point, button: MouseButton, steps: u32) -> Result<()> {
        self.bridge
            .submit(move |kvm| async move { kvm.mouse().drag(from, to, button, steps).await })
    }

    /// Left-button drag with the default number of steps.
    pub fn drag_default(&self, from: Point, to: Point) -> Result<()> {
        self.drag(from, to, MouseButton::Left, DEFAULT_DRAG_STEPS)
    }

    pub fn relative_move(&self, dx: i32, dy: i32) -> Result<()> {
        self.bridge
            .submit(move |kvm| async move { kvm.mouse().relative_move(dx, dy).await })
    }
}

/// Blocking [`Video`](crate::application::Video).
pub struct BlockingVideo<'a> {
    bridge: &'a Bridge,
}

impl BlockingVideo<'_> {
    pub fn screenshot(&self, save_to: Option<&Path>) -> Result<Vec<u8>> {
        let save_to: Option<PathBuf> = save_to.map(Path::to_path_buf);
        self.bridge.submit(move |kvm| async move {
            kvm.video().screenshot(save_to.as_deref()).await
        })
    }

    pub fn streamer_info(&self) -> Result<Value> {
        self.bridge
            .submit(|kvm| async move { kvm.video().streamer_info().await })
    }
}

/// Blocking [`Msd`](crate::application::Msd).
pub struct BlockingMsd<'a> {
    bridge: &'a Bridge,
}

impl BlockingMsd<'_> {
    pub fn status(&self) -> Result<Value> {
        self.bridge.submit(|kvm| async move { kvm.msd().status().await })
    }

    pub fn list_images(&self) -> Result<Value> {
        self.bridge
            .submit(|kvm| async move { kvm.msd().list_images().await })
    }

    pub fn upload(&self, path: &Path, image_name: Option<&str>) -> Result<Value> {
        let path = path.to_path_buf();
        let image_name = image_name.map(str::to_string);
        self.bridge.submit(move |kvm| async move {
            kvm.msd().upload(&path, image_name.as_deref()).await
        })
    }

    pub fn upload_url(&self, url: &str, image_name: Option<&str>) -> Result<Value> {
        let url = url.to_string();
        let image_name = image_name.map(str::to_string);
        self.bridge.submit(move |kvm| async move {
            kvm.msd().upload_url(&url, image_name.as_deref()).await
        })
    }

    pub fn set_image(&self, name: &str, mode: DriveMode) -> Result<Value> {
        let name = name.to_string();
        self.bridge
            .submit(move |kvm| async move { kvm.msd().set_image(&name, mode).await })
    }

    pub fn connect(&self) -> Result<Value> {
        self.bridge.submit(|kvm| async move { kvm.msd().connect().await })
    }

    pub fn disconnect(&self) -> Result<Value> {
        self.bridge
            .submit(|kvm| async move { kvm.msd().disconnect().await })
    }

    pub fn remove_image(&self, name: &str) -> Result<Value> {
        let name = name.to_string();
        self.bridge
            .submit(move |kvm| async move { kvm.msd().remove_image(&name).await })
    }
}

/// Blocking [`Atx`](crate::application::Atx).
pub struct BlockingAtx<'a> {
    bridge: &'a Bridge,
}

impl BlockingAtx<'_> {
    pub fn status(&self) -> Result<Value> {
        self.bridge.submit(|kvm| async move { kvm.atx().status().await })
    }

    pub fn power(&self) -> Result<Value> {
        self.click(AtxButton::Power)
    }

    pub fn power_long(&self) -> Result<Value> {
        self.click(AtxButton::PowerLong)
    }

    pub fn reset(&self) -> Result<Value> {
        self.click(AtxButton::Reset)
    }

    pub fn click(&self, button: AtxButton) -> Result<Value> {
        self.bridge
            .submit(move |kvm| async move { kvm.atx().click(button).await })
    }
}
