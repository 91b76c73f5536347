//! Mass-storage (virtual media) façade.
//!
//! The device keeps a library of disk images and can present one of them to
//! the target as a CD-ROM or flash drive.  A typical boot-from-ISO sequence:
//!
//! ```text
//! upload("debian.iso")            msd/write?image=debian.iso   (octet-stream)
//! set_image("debian.iso", Cdrom)  msd/set_params?image=...&cdrom=1
//! connect()                       msd/set_connected?connected=1
//! ```

use std::io;
use std::path::Path;

use pikvm_core::{DriveMode, KvmError, Result};
use serde_json::{Map, Value};
use tracing::info;

use super::{DeviceTransport, RequestBody};

pub struct Msd<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: DeviceTransport + ?Sized> Msd<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Full MSD state: storage, drive, busy flag.
    pub async fn status(&self) -> Result<Value> {
        self.transport.get("msd", Vec::new()).await
    }

    /// The `storage.images` map of [`status`](Self::status), or `{}` when the
    /// device reports none.
    pub async fn list_images(&self) -> Result<Value> {
        let status = self.status().await?;
        Ok(status
            .get("storage")
            .and_then(|storage| storage.get("images"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Uploads a local image file.
    ///
    /// The image is stored under `image_name`, or under the file's base name
    /// when `None`.  The whole file is read into memory first.
    ///
    /// # Errors
    ///
    /// [`KvmError::Io`] if the file cannot be read or `path` has no file name.
    pub async fn upload(&self, path: &Path, image_name: Option<&str>) -> Result<Value> {
        let name = match image_name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| KvmError::Io {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                })?,
        };

        let data = tokio::fs::read(path).await.map_err(|source| KvmError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(image = %name, bytes = data.len(), "uploading image");
        self.transport
            .post("msd/write", vec![("image", name)], RequestBody::Octets(data))
            .await
    }

    /// Asks the device to download an image from `url` itself.
    pub async fn upload_url(&self, url: &str, image_name: Option<&str>) -> Result<Value> {
        let mut query = vec![("url", url.to_string())];
        if let Some(name) = image_name.filter(|name| !name.is_empty()) {
            query.push(("image", name.to_string()));
        }
        self.transport
            .post("msd/write_remote", query, RequestBody::Empty)
            .await
    }

    /// Selects the image the drive presents, and how.
    pub async fn set_image(&self, name: &str, mode: DriveMode) -> Result<Value> {
        self.transport
            .post(
                "msd/set_params",
                vec![
                    ("image", name.to_string()),
                    ("cdrom", mode.cdrom_flag().to_string()),
                ],
                RequestBody::Empty,
            )
            .await
    }

    /// Attaches the drive to the target.
    pub async fn connect(&self) -> Result<Value> {
        self.set_connected(true).await
    }

    /// Detaches the drive from the target.
    pub async fn disconnect(&self) -> Result<Value> {
        self.set_connected(false).await
    }

    /// Deletes an image from the device's storage.
    pub async fn remove_image(&self, name: &str) -> Result<Value> {
        self.transport
            .post("msd/remove", vec![("image", name.to_string())], RequestBody::Empty)
            .await
    }

    async fn set_connected(&self, connected: bool) -> Result<Value> {
        let flag = if connected { "1" } else { "0" };
        self.transport
            .post(
                "msd/set_connected",
                vec![("connected", flag.to_string())],
                RequestBody::Empty,
            )
            .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::infrastructure::mock::{RecordedCall, RecordingTransport};

    fn post(path: &str, query: Vec<(&'static str, &str)>, body: RequestBody) -> RecordedCall {
        RecordedCall::Post {
            path: path.to_string(),
            query: query.into_iter().map(|(k, v)| (k, v.to_string())).collect(),
            body,
        }
    }

    fn temp_image(name: &str, content: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pikvm-msd-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_uses_file_base_name() {
        // Arrange
        let transport = RecordingTransport::new();
        let path = temp_image("debian.iso", b"ISO9660");

        // Act
        Msd::new(&transport).upload(&path, None).await.unwrap();

        // Assert
        assert_eq!(
            transport.calls(),
            vec![post(
                "msd/write",
                vec![("image", "debian.iso")],
                RequestBody::Octets(b"ISO9660".to_vec()),
            )]
        );
    }

    #[tokio::test]
    async fn test_upload_with_explicit_name() {
        let transport = RecordingTransport::new();
        let path = temp_image("local.img", b"x");

        Msd::new(&transport)
            .upload(&path, Some("remote.img"))
            .await
            .unwrap();

        assert_eq!(
            transport.calls(),
            vec![post(
                "msd/write",
                vec![("image", "remote.img")],
                RequestBody::Octets(b"x".to_vec()),
            )]
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file_sends_nothing() {
        let transport = RecordingTransport::new();

        let result = Msd::new(&transport)
            .upload(Path::new("/nonexistent/pikvm/missing.iso"), None)
            .await;

        assert!(matches!(result, Err(KvmError::Io { .. })));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_url_omits_empty_name() {
        let transport = RecordingTransport::new();
        let msd = Msd::new(&transport);

        msd.upload_url("http://mirror/a.iso", None).await.unwrap();
        msd.upload_url("http://mirror/b.iso", Some("")).await.unwrap();
        msd.upload_url("http://mirror/c.iso", Some("c.iso")).await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                post("msd/write_remote", vec![("url", "http://mirror/a.iso")], RequestBody::Empty),
                post("msd/write_remote", vec![("url", "http://mirror/b.iso")], RequestBody::Empty),
                post(
                    "msd/write_remote",
                    vec![("url", "http://mirror/c.iso"), ("image", "c.iso")],
                    RequestBody::Empty,
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_image_and_connection_flags() {
        let transport = RecordingTransport::new();
        let msd = Msd::new(&transport);

        msd.set_image("a.iso", DriveMode::Cdrom).await.unwrap();
        msd.set_image("b.img", DriveMode::Flash).await.unwrap();
        msd.connect().await.unwrap();
        msd.disconnect().await.unwrap();
        msd.remove_image("a.iso").await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                post("msd/set_params", vec![("image", "a.iso"), ("cdrom", "1")], RequestBody::Empty),
                post("msd/set_params", vec![("image", "b.img"), ("cdrom", "0")], RequestBody::Empty),
                post("msd/set_connected", vec![("connected", "1")], RequestBody::Empty),
                post("msd/set_connected", vec![("connected", "0")], RequestBody::Empty),
                post("msd/remove", vec![("image", "a.iso")], RequestBody::Empty),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_images_projects_storage_images() {
        let transport = RecordingTransport::with_response(json!({
            "busy": false,
            "storage": {"images": {"debian.iso": {"size": 1024}}}
        }));

        let images = Msd::new(&transport).list_images().await.unwrap();

        assert_eq!(images, json!({"debian.iso": {"size": 1024}}));
    }

    #[tokio::test]
    async fn test_list_images_defaults_to_empty_map() {
        let transport = RecordingTransport::with_response(json!({"busy": false}));

        let images = Msd::new(&transport).list_images().await.unwrap();

        assert_eq!(images, json!({}));
    }
}
