//! The async entry point.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use pikvm_core::{DeviceConfig, Result};
use serde_json::Value;

use crate::application::{Atx, DeviceTransport, Keyboard, Mouse, Msd, Video};
use crate::infrastructure::session::Session;

/// Async client for one device.
///
/// Façade accessors are cheap borrows of the shared [`Session`]; create them
/// per call rather than storing them.
///
/// ```no_run
/// use pikvm_client::{AsyncKvmClient, DeviceConfig, MouseButton, Point};
///
/// # async fn demo() -> pikvm_client::Result<()> {
/// let kvm = AsyncKvmClient::connect(DeviceConfig::new("comet.local").with_credentials("admin", "pw")).await?;
/// kvm.keyboard().shortcut(&["ControlLeft", "AltLeft", "Delete"]).await?;
/// kvm.mouse().click(Some(Point::new(640, 360)), MouseButton::Left).await?;
/// kvm.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct AsyncKvmClient {
    session: Session,
}

impl AsyncKvmClient {
    /// Creates a client without contacting the device.
    ///
    /// Resolves the host with the blocking system resolver, so construction
    /// may stall the calling thread on DNS.  From async code use
    /// [`AsyncKvmClient::connect`].
    pub fn new(config: DeviceConfig) -> Result<Self> {
        Ok(Self {
            session: Session::new(config)?,
        })
    }

    /// Creates a client, resolving the host on the runtime.
    pub async fn connect(config: DeviceConfig) -> Result<Self> {
        Ok(Self {
            session: Session::connect(config).await?,
        })
    }

    /// Runs `work` with a fresh client and closes it afterwards, whether or
    /// not `work` succeeded.
    ///
    /// An error from `work` takes precedence over an error from closing.
    pub async fn scoped<F, Fut, T>(config: DeviceConfig, work: F) -> Result<T>
    where
        F: FnOnce(Arc<AsyncKvmClient>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let client = Arc::new(Self::connect(config).await?);
        let outcome = work(Arc::clone(&client)).await;
        let closed = client.close().await;
        let value = outcome?;
        closed.map(|()| value)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn keyboard(&self) -> Keyboard<'_, Session> {
        Keyboard::new(&self.session)
    }

    pub fn mouse(&self) -> Mouse<'_, Session> {
        Mouse::new(&self.session)
    }

    pub fn video(&self) -> Video<'_, Session> {
        Video::new(&self.session)
    }

    pub fn msd(&self) -> Msd<'_, Session> {
        Msd::new(&self.session)
    }

    pub fn atx(&self) -> Atx<'_, Session> {
        Atx::new(&self.session)
    }

    /// Device information (hardware, system, extras).
    pub async fn info(&self) -> Result<Value> {
        self.session.get("info", Vec::new()).await
    }

    pub async fn streamer_info(&self) -> Result<Value> {
        self.video().streamer_info().await
    }

    pub async fn screenshot(&self, save_to: Option<&Path>) -> Result<Vec<u8>> {
        self.video().screenshot(save_to).await
    }

    /// Logs in (once) and returns the session token.
    pub async fn token(&self) -> Result<String> {
        self.session.ensure_token().await
    }

    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }
}
