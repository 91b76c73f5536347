//! Device connection settings.
//!
//! [`DeviceConfig`] describes one KVM appliance: where it lives, which
//! credentials to present and how much to trust its TLS certificate.  It can
//! be built in code or loaded from a TOML file:
//!
//! ```toml
//! host = "comet.local"
//! username = "admin"
//! password = "hunter2"
//! verify_tls = false
//! request_timeout_secs = 30
//! ```
//!
//! Every field except `host` has a default, so a file holding only `host` and
//! `password` is enough for a stock device.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// URL scheme family used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// `https://` for the API and `wss://` for the event channel.
    #[default]
    Https,
    /// `http://` and `ws://`, for plain-text endpoints behind a proxy.
    Http,
}

impl Scheme {
    pub fn http(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }

    pub fn ws(self) -> &'static str {
        match self {
            Self::Https => "wss",
            Self::Http => "ws",
        }
    }
}

/// Connection settings for a single device.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Hostname or IP address of the device (e.g. `comet.local`).
    pub host: String,
    /// Non-default port, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Verify the device certificate.  Devices ship self-signed
    /// certificates, so this is off by default.
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default)]
    pub scheme: Scheme,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl DeviceConfig {
    /// Settings for `host` with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: default_username(),
            password: String::new(),
            verify_tls: false,
            scheme: Scheme::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML or `host`
    /// is missing.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its content is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The host with any trailing slashes removed.
    pub fn normalized_host(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `scheme://host[:port]` for the HTTP API.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme.http(), self.authority(self.normalized_host()))
    }

    /// WebSocket URL for the HID event channel on `address`.
    ///
    /// `address` is normally the IP the host resolved to when the session was
    /// created, not the hostname itself.
    pub fn ws_url(&self, address: &str) -> String {
        format!("{}://{}/api/ws?stream=0", self.scheme.ws(), self.authority(address))
    }

    /// `host[:port]`, bracketing bare IPv6 addresses.
    fn authority(&self, host: &str) -> String {
        let host = match host.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
            _ => host.to_string(),
        };
        match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host,
        }
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("scheme", &self.scheme)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        // Arrange / Act
        let cfg = DeviceConfig::new("comet.local");

        // Assert
        assert_eq!(cfg.username, "admin");
        assert_eq!(cfg.password, "");
        assert!(!cfg.verify_tls);
        assert_eq!(cfg.scheme, Scheme::Https);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let cfg = DeviceConfig::new("comet.local/");
        assert_eq!(cfg.base_url(), "https://comet.local");
    }

    #[test]
    fn test_base_url_includes_port_and_scheme() {
        let cfg = DeviceConfig::new("10.0.0.7")
            .with_port(8080)
            .with_scheme(Scheme::Http);
        assert_eq!(cfg.base_url(), "http://10.0.0.7:8080");
    }

    #[test]
    fn test_ws_url_targets_given_address() {
        let cfg = DeviceConfig::new("comet.local");
        assert_eq!(cfg.ws_url("192.168.8.1"), "wss://192.168.8.1/api/ws?stream=0");
    }

    #[test]
    fn test_ws_url_brackets_ipv6() {
        let cfg = DeviceConfig::new("comet.local").with_port(443);
        assert_eq!(cfg.ws_url("fe80::1"), "wss://[fe80::1]:443/api/ws?stream=0");
    }

    #[test]
    fn test_from_toml_minimal_file() {
        let cfg = DeviceConfig::from_toml_str("host = \"kvm.lan\"\npassword = \"pw\"\n").unwrap();
        assert_eq!(cfg.host, "kvm.lan");
        assert_eq!(cfg.password, "pw");
        assert_eq!(cfg.username, "admin");
        assert_eq!(cfg.request_timeout_secs, 30);
    }

    #[test]
    fn test_from_toml_full_file() {
        let text = r#"
            host = "kvm.lan"
            port = 8443
            username = "ops"
            password = "pw"
            verify_tls = true
            scheme = "http"
            request_timeout_secs = 5
        "#;

        let cfg = DeviceConfig::from_toml_str(text).unwrap();

        assert_eq!(cfg.port, Some(8443));
        assert_eq!(cfg.username, "ops");
        assert!(cfg.verify_tls);
        assert_eq!(cfg.scheme, Scheme::Http);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_toml_without_host_fails() {
        let result = DeviceConfig::from_toml_str("password = \"pw\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = DeviceConfig::load(Path::new("/nonexistent/pikvm/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = DeviceConfig::new("kvm").with_credentials("admin", "s3cret");
        let text = format!("{cfg:?}");
        assert!(!text.contains("s3cret"));
        assert!(text.contains("<redacted>"));
    }
}
