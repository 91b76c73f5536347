//! The device's HID event WebSocket.
//!
//! # Lifecycle
//!
//! ```text
//! open ──► handshake (Basic auth) ──► drain state burst ──► split
//!                                                           │
//!                      ┌────────────────────────────────────┴──────┐
//!                      ▼                                           ▼
//!            sink: send_text / probe               reader task: discard inbound
//! ```
//!
//! Right after the handshake the device pushes its full state (`gpio`, `hid`,
//! `atx`, `msd`, ..., `streamer`).  Nobody in this client consumes device
//! events, so the burst is drained before the socket is handed out and a
//! background task keeps discarding whatever arrives later.  When that task
//! ends (device closed the socket, network error) the next
//! [`probe`](DeviceSocket::probe) fails and the session reconnects.

use std::time::Duration;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use pikvm_core::domain::pacing::{DRAIN_MAX_MESSAGES, DRAIN_RECV_TIMEOUT};
use pikvm_core::{check_status, DeviceConfig, DeviceEvent, KvmError, Result, Scheme};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use super::tls;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the drain step saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Frames read, including the `streamer` frame if one was seen.
    pub consumed: usize,
    pub saw_streamer: bool,
    /// A receive timed out before the budget was spent.
    pub timed_out: bool,
    /// The device closed the stream during the drain.
    pub stream_ended: bool,
}

/// Reads and discards up to `max_messages` frames from `stream`.
///
/// Stops early on a `streamer` frame, on the first receive that takes longer
/// than `recv_timeout`, or when the stream ends.  Frames that are not JSON
/// still count toward the budget.
///
/// # Errors
///
/// A WebSocket error while reading fails the drain (and with it the
/// connection attempt).
pub async fn drain_initial_burst<S>(
    stream: &mut S,
    max_messages: usize,
    recv_timeout: Duration,
) -> Result<DrainReport>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    let mut report = DrainReport::default();

    while report.consumed < max_messages {
        let frame = match tokio::time::timeout(recv_timeout, stream.next()).await {
            Err(_) => {
                report.timed_out = true;
                break;
            }
            Ok(None) => {
                report.stream_ended = true;
                break;
            }
            Ok(Some(Err(e))) => return Err(KvmError::transport("drain device state burst", e)),
            Ok(Some(Ok(frame))) => frame,
        };

        report.consumed += 1;
        if let Message::Text(text) = &frame {
            if DeviceEvent::parse(text).is_some_and(|event| event.is_streamer()) {
                report.saw_streamer = true;
                break;
            }
        }
    }

    Ok(report)
}

/// An open, drained event channel.
pub struct DeviceSocket {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
}

impl DeviceSocket {
    /// Connects to `address` (the pre-resolved device IP) and drains the
    /// initial state burst.
    pub async fn open(config: &DeviceConfig, address: &str) -> Result<Self> {
        let url = config.ws_url(address);
        let request = handshake_request(&url, &config.username, &config.password)?;
        let connector = match config.scheme {
            Scheme::Https => Some(Connector::Rustls(tls::client_config(config.verify_tls)?)),
            Scheme::Http => None,
        };

        debug!(%url, verify_tls = config.verify_tls, "opening device WebSocket");
        let (mut stream, _response) = connect_async_tls_with_config(request, None, false, connector)
            .await
            .map_err(handshake_error)?;

        let report = drain_initial_burst(&mut stream, DRAIN_MAX_MESSAGES, DRAIN_RECV_TIMEOUT).await?;
        debug!(
            consumed = report.consumed,
            saw_streamer = report.saw_streamer,
            timed_out = report.timed_out,
            stream_ended = report.stream_ended,
            "drained device state burst"
        );

        let (sink, inbound) = stream.split();
        let reader = tokio::spawn(discard_inbound(inbound));

        info!(%url, "device WebSocket connected");
        Ok(Self { sink, reader })
    }

    /// Checks that the connection is still usable by sending a ping.
    ///
    /// Fails without touching the network when the inbound side has already
    /// ended.
    pub async fn probe(&mut self) -> Result<()> {
        if self.reader.is_finished() {
            return Err(KvmError::NotConnected(
                "device closed the event channel".to_string(),
            ));
        }
        self.sink
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| KvmError::transport("WebSocket liveness probe", e))
    }

    pub async fn send_text(&mut self, frame: String) -> Result<()> {
        trace!(bytes = frame.len(), "sending event frame");
        self.sink
            .send(Message::Text(frame))
            .await
            .map_err(|e| KvmError::transport("send HID event", e))
    }

    /// Sends a close frame and stops the reader.
    ///
    /// A connection the device already closed is not an error.
    pub async fn close(&mut self) -> Result<()> {
        let result = match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(KvmError::transport("close WebSocket", e)),
        };
        self.reader.abort();
        result
    }
}

impl Drop for DeviceSocket {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Handshake request for `url` carrying a Basic `Authorization` header.
fn handshake_request(url: &str, username: &str, password: &str) -> Result<Request> {
    let mut request = url
        .into_client_request()
        .map_err(|e| KvmError::transport("build WebSocket request", e))?;

    let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {credentials}"))
        .map_err(|e| KvmError::transport("build Authorization header", e))?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);

    Ok(request)
}

/// A rejected upgrade carries the HTTP status; 401/403 become `Auth` like on
/// the HTTP API.
fn handshake_error(error: WsError) -> KvmError {
    if let WsError::Http(response) = &error {
        if let Err(rejected) = check_status(response.status().as_u16()) {
            return rejected;
        }
    }
    KvmError::transport("WebSocket handshake", error)
}

async fn discard_inbound(mut inbound: SplitStream<WsStream>) {
    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Close(close)) => {
                debug!(?close, "device closed the event channel");
                break;
            }
            Ok(frame) => trace!(bytes = frame.len(), "discarding device frame"),
            Err(e) => {
                debug!(error = %e, "event channel read failed");
                break;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
