//! The transport session: one per device.
//!
//! A [`Session`] owns every connection to the device:
//!
//! | Resource          | Created                     | Shared by                  |
//! |-------------------|-----------------------------|----------------------------|
//! | `reqwest::Client` | in [`Session::new`]         | all HTTP calls, concurrent |
//! | login token       | first [`Session::ensure_token`] | cached until close     |
//! | [`DeviceSocket`]  | first HID event             | all events, serialized     |
//!
//! # Why resolve the host up front?
//!
//! Devices are usually reached by an mDNS name (`comet.local`).  Some
//! resolvers answer slowly or not at all inside the WebSocket library's own
//! lookup, so the name is resolved once when the session is created and the
//! WebSocket always dials the resulting IP.  If resolution fails the hostname
//! is used as-is.
//!
//! [`Session::new`] resolves with the blocking system resolver;
//! [`Session::connect`] uses `tokio::net::lookup_host` and is the one to call
//! from async code.
//!
//! # Closing
//!
//! [`Session::close`] releases the HTTP client, the WebSocket and the token
//! even if closing the WebSocket fails.  It is idempotent; after it, every
//! call returns [`KvmError::NotConnected`].

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use pikvm_core::protocol::events::encode_frame;
use pikvm_core::{check_status, decode_envelope, DeviceConfig, KvmError, Result, Scheme};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::application::{DeviceTransport, Query, RequestBody};

pub mod tls;
pub mod websocket;

pub use websocket::{drain_initial_burst, DeviceSocket, DrainReport};

/// Connection state for one device.
pub struct Session {
    config: DeviceConfig,
    /// IP the host resolved to at creation time, or the host itself.
    address: String,
    http: StdMutex<Option<reqwest::Client>>,
    token: Mutex<Option<String>>,
    socket: Mutex<Option<DeviceSocket>>,
    closed: AtomicBool,
}

impl Session {
    /// Resolves the host and builds the HTTP client.  No network traffic
    /// reaches the device until the first call.
    ///
    /// The lookup blocks the calling thread; inside a runtime prefer
    /// [`Session::connect`].
    ///
    /// # Errors
    ///
    /// [`KvmError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let address = resolve_host(&config);
        Self::with_address(config, address)
    }

    /// Like [`Session::new`], but resolves the host without blocking the
    /// runtime.
    ///
    /// # Errors
    ///
    /// [`KvmError::Transport`] if the HTTP client cannot be built.
    pub async fn connect(config: DeviceConfig) -> Result<Self> {
        let address = lookup_host(&config).await;
        Self::with_address(config, address)
    }

    fn with_address(config: DeviceConfig, address: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KvmError::transport("build HTTP client", e))?;

        info!(host = %config.host, %address, "session created");

        Ok(Self {
            config,
            address,
            http: StdMutex::new(Some(http)),
            token: Mutex::new(None),
            socket: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The address the WebSocket dials.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Logs in once and returns the cached token.
    ///
    /// A failed login is not cached; the next call tries again.
    ///
    /// # Errors
    ///
    /// [`KvmError::Auth`] if the device rejects the credentials.
    pub async fn ensure_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        self.ensure_open()?;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        let request = self.request(Method::POST, "auth/login")?.form(&[
            ("user", self.config.username.as_str()),
            ("passwd", self.config.password.as_str()),
        ]);
        let (status, body) = self.execute(request, "POST /api/auth/login").await?;

        let result = match decode_envelope(status, &body) {
            Ok(result) => result,
            Err(KvmError::Api { .. }) => return Err(KvmError::Auth("Login failed".to_string())),
            Err(e) => return Err(e),
        };
        let issued = result
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| KvmError::InvalidResponse("login result carries no token".to_string()))?
            .to_string();

        info!("logged in");
        *token = Some(issued.clone());
        Ok(issued)
    }

    /// Returns the live WebSocket, probing the cached one and reconnecting
    /// if the probe fails.
    ///
    /// The returned guard holds the session's socket lock, so at most one
    /// connection attempt is ever in flight and frames from concurrent callers
    /// never interleave mid-send.
    pub async fn ensure_websocket(&self) -> Result<MappedMutexGuard<'_, DeviceSocket>> {
        let mut slot = self.socket.lock().await;
        self.ensure_open()?;

        let alive = match slot.as_mut() {
            Some(socket) => match socket.probe().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "WebSocket probe failed; reconnecting");
                    false
                }
            },
            None => false,
        };

        if !alive {
            // Dropping the stale socket stops its reader.
            *slot = None;
            *slot = Some(DeviceSocket::open(&self.config, &self.address).await?);
        }

        MutexGuard::try_map(slot, Option::as_mut)
            .map_err(|_| KvmError::NotConnected("WebSocket unavailable".to_string()))
    }

    /// Releases every resource.  Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the WebSocket close failure, if any.  Resources are released
    /// regardless.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let socket = self.socket.lock().await.take();
        let http = self
            .http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(http);
        self.token.lock().await.take();

        let result = match socket {
            Some(mut socket) => socket.close().await,
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!(error = %e, "WebSocket close failed");
        }

        info!(host = %self.config.host, "session closed");
        result
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(KvmError::NotConnected("session is closed".to_string()));
        }
        Ok(())
    }

    /// A request for `/api/{path}` with basic credentials attached.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        self.ensure_open()?;
        let http = self
            .http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| KvmError::NotConnected("session is closed".to_string()))?;

        let url = format!("{}/api/{}", self.config.base_url(), path);
        Ok(http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password)))
    }

    async fn execute(&self, request: RequestBuilder, what: &str) -> Result<(u16, Vec<u8>)> {
        let response = request
            .send()
            .await
            .map_err(|e| KvmError::transport(what, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| KvmError::transport(what, e))?;
        debug!(call = what, status, bytes = body.len(), "device responded");
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl DeviceTransport for Session {
    async fn get(&self, path: &str, query: Query) -> Result<Value> {
        let request = self.request(Method::GET, path)?.query(&query);
        let (status, body) = self.execute(request, &format!("GET /api/{path}")).await?;
        decode_envelope(status, &body)
    }

    async fn post(&self, path: &str, query: Query, body: RequestBody) -> Result<Value> {
        let request = self.request(Method::POST, path)?.query(&query);
        let request = match body {
            RequestBody::Empty => request,
            RequestBody::Text(text) => request
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text),
            RequestBody::Octets(bytes) => request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        };
        let (status, body) = self.execute(request, &format!("POST /api/{path}")).await?;
        decode_envelope(status, &body)
    }

    async fn get_bytes(&self, path: &str, query: Query) -> Result<Vec<u8>> {
        let request = self.request(Method::GET, path)?.query(&query);
        let (status, body) = self.execute(request, &format!("GET /api/{path}")).await?;
        check_status(status)?;
        Ok(body)
    }

    async fn send_event(&self, event_type: &str, event: Value) -> Result<()> {
        let frame = encode_frame(event_type, &event);
        let mut socket = self.ensure_websocket().await?;
        debug!(event_type, "sending HID event");
        socket.send_text(frame).await
    }
}

/// Name and port to look up, or `None` when the host is already an IP.
fn lookup_target(config: &DeviceConfig) -> Option<(&str, u16)> {
    let host = config.normalized_host();
    if host.parse::<IpAddr>().is_ok() {
        return None;
    }
    let port = config.port.unwrap_or(match config.scheme {
        Scheme::Https => 443,
        Scheme::Http => 80,
    });
    Some((host, port))
}

/// First IPv4 address, else the first address of any family.
fn preferred_ip(addrs: impl Iterator<Item = SocketAddr>) -> Option<String> {
    let addrs: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .map(IpAddr::to_string)
}

/// Resolves the configured host once, preferring IPv4.
fn resolve_host(config: &DeviceConfig) -> String {
    let Some((host, port)) = lookup_target(config) else {
        return config.normalized_host().to_string();
    };
    match (host, port).to_socket_addrs() {
        Ok(addrs) => preferred_ip(addrs).unwrap_or_else(|| host.to_string()),
        Err(e) => {
            debug!(host, error = %e, "host resolution failed; dialing the name");
            host.to_string()
        }
    }
}

/// [`resolve_host`] on the runtime's resolver.
async fn lookup_host(config: &DeviceConfig) -> String {
    let Some((host, port)) = lookup_target(config) else {
        return config.normalized_host().to_string();
    };
    match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => preferred_ip(addrs).unwrap_or_else(|| host.to_string()),
        Err(e) => {
            debug!(host, error = %e, "host resolution failed; dialing the name");
            host.to_string()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
