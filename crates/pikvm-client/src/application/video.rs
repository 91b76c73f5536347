//! Video façade: JPEG snapshots and streamer state.

use std::path::Path;

use pikvm_core::{KvmError, Result};
use serde_json::Value;
use tracing::debug;

use super::DeviceTransport;

pub struct Video<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: DeviceTransport + ?Sized> Video<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Grabs the current frame as JPEG bytes, also writing them to `save_to`
    /// when given.
    ///
    /// # Errors
    ///
    /// [`KvmError::Io`] if the file cannot be written; the bytes are lost in
    /// that case.
    pub async fn screenshot(&self, save_to: Option<&Path>) -> Result<Vec<u8>> {
        let jpeg = self
            .transport
            .get_bytes("streamer/snapshot", Vec::new())
            .await?;

        if let Some(path) = save_to {
            tokio::fs::write(path, &jpeg)
                .await
                .map_err(|source| KvmError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!(path = %path.display(), bytes = jpeg.len(), "screenshot saved");
        }

        Ok(jpeg)
    }

    /// Streamer state (resolution, FPS, client count, ...).
    pub async fn streamer_info(&self) -> Result<Value> {
        self.transport.get("streamer", Vec::new()).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
