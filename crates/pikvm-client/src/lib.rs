//! pikvm-client library crate.
//!
//! Remote control for a PiKVM-compatible KVM appliance: authenticate, inject
//! keyboard and mouse input, grab screenshots, manage virtual media and press
//! the target machine's power buttons.
//!
//! # Architecture
//!
//! ```text
//! caller
//!   │
//!   ├── KvmClient (blocking)          blocking.rs
//!   │     └── ExecutionBridge         infrastructure/bridge.rs
//!   │           (worker thread + current-thread runtime)
//!   ▼
//! AsyncKvmClient                      client.rs
//!   ├── Keyboard / Mouse / Video / Msd / Atx      application/
//!   │     (generic over the DeviceTransport trait)
//!   ▼
//! Session                             infrastructure/session/
//!   ├── reqwest::Client  ── HTTPS ──►  /api/...
//!   └── DeviceSocket     ── WSS   ──►  /api/ws?stream=0
//! ```
//!
//! # Layer rules
//!
//! - `application` knows only the [`DeviceTransport`] trait and the types of
//!   `pikvm-core`; it never touches sockets.
//! - `infrastructure` owns every socket, thread and runtime.
//!
//! # Example
//!
//! ```no_run
//! use pikvm_client::{DeviceConfig, KvmClient, MouseButton, Point};
//!
//! # fn main() -> pikvm_client::Result<()> {
//! let kvm = KvmClient::new(
//!     DeviceConfig::new("comet.local").with_credentials("admin", "password"),
//! )?;
//! kvm.keyboard().type_text("hello", "en-us")?;
//! kvm.mouse().click(Some(Point::new(500, 300)), MouseButton::Left)?;
//! let jpeg = kvm.screenshot(None)?;
//! kvm.close()?;
//! # let _ = jpeg;
//! # Ok(())
//! # }
//! ```

/// Application layer: keyboard, mouse, video, virtual media and power façades.
pub mod application;

/// Infrastructure layer: transport session, execution bridge, test doubles.
pub mod infrastructure;

pub mod blocking;
pub mod client;

pub use application::{DeviceTransport, Query, RequestBody};
pub use blocking::KvmClient;
pub use client::AsyncKvmClient;
pub use infrastructure::bridge::{BridgeState, ExecutionBridge, ShutdownOutcome};
pub use infrastructure::session::Session;
pub use pikvm_core::{
    AtxButton, DeviceConfig, DriveMode, HidEvent, KvmError, MouseButton, Point, Result, Scheme,
};
