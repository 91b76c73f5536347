//! ATX power façade.

use pikvm_core::{AtxButton, Result};
use serde_json::Value;
use tracing::info;

use super::{DeviceTransport, RequestBody};

pub struct Atx<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: DeviceTransport + ?Sized> Atx<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Power LED, HDD LED and busy state.
    pub async fn status(&self) -> Result<Value> {
        self.transport.get("atx", Vec::new()).await
    }

    /// Short press of the power button.
    pub async fn power(&self) -> Result<Value> {
        self.click(AtxButton::Power).await
    }

    /// Long press of the power button (forced shutdown).
    pub async fn power_long(&self) -> Result<Value> {
        self.click(AtxButton::PowerLong).await
    }

    pub async fn reset(&self) -> Result<Value> {
        self.click(AtxButton::Reset).await
    }

    pub async fn click(&self, button: AtxButton) -> Result<Value> {
        info!(%button, "pressing ATX button");
        self.transport
            .post(
                "atx/click",
                vec![("button", button.as_str().to_string())],
                RequestBody::Empty,
            )
            .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
