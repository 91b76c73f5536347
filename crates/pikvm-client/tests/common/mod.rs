//! Shared fixtures for the pikvm-client integration tests.
//!
//! [`FakeDevice`] is a local WebSocket server standing in for the device's
//! `/api/ws` endpoint: it records the `Authorization` header of every
//! handshake, pushes a configurable state burst and forwards every text frame
//! it receives to the test.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pikvm_client::{DeviceConfig, Scheme};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// `admin:pw` in the Basic scheme.
pub const BASIC_ADMIN_PW: &str = "Basic YWRtaW46cHc=";

pub fn state_frame(event_type: &str) -> String {
    format!(r#"{{"event_type": "{event_type}", "event": {{"online": true}}}}"#)
}

/// The burst a real device sends, ending with `streamer`.
pub fn full_state_burst() -> Vec<String> {
    ["gpio", "hid", "atx", "msd", "streamer"]
        .iter()
        .map(|event_type| state_frame(event_type))
        .collect()
}

pub struct FakeDevice {
    pub addr: SocketAddr,
    /// Completed WebSocket handshakes.
    pub accepted: Arc<AtomicUsize>,
    pub auth_headers: Arc<Mutex<Vec<String>>>,
    /// Text frames received from the client, across all connections.
    pub frames: mpsc::UnboundedReceiver<String>,
}

impl FakeDevice {
    /// Starts a device that keeps every connection open.
    pub async fn start(burst: Vec<String>) -> Self {
        Self::start_with(burst, None).await
    }

    /// Starts a device that closes its first connection `close_first_after`
    /// the state burst, without reading from it.
    pub async fn start_with(burst: Vec<String>, close_first_after: Option<Duration>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let auth_headers = Arc::new(Mutex::new(Vec::new()));
        let (frames_tx, frames) = mpsc::unbounded_channel();

        let server = Connection {
            burst,
            close_first_after,
            accepted: Arc::clone(&accepted),
            auth_headers: Arc::clone(&auth_headers),
            frames: frames_tx,
        };
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                tokio::spawn(server.clone().serve(tcp));
            }
        });

        Self {
            addr,
            accepted,
            auth_headers,
            frames,
        }
    }

    /// Plain-`ws://` settings pointing at this device as `admin:pw`.
    pub fn config(&self) -> DeviceConfig {
        DeviceConfig::new("127.0.0.1")
            .with_port(self.addr.port())
            .with_scheme(Scheme::Http)
            .with_credentials("admin", "pw")
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Waits up to a second for the next frame from the client.
    pub async fn next_frame(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(1), self.frames.recv())
            .await
            .expect("no frame within a second")
            .expect("device stopped");
        serde_json::from_str(&text).unwrap()
    }
}

#[derive(Clone)]
struct Connection {
    burst: Vec<String>,
    close_first_after: Option<Duration>,
    accepted: Arc<AtomicUsize>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    frames: mpsc::UnboundedSender<String>,
}

impl Connection {
    async fn serve(self, tcp: TcpStream) {
        let auth_headers = Arc::clone(&self.auth_headers);
        let callback = move |request: &Request, response: Response| {
            if let Some(value) = request.headers().get("authorization") {
                let value = value.to_str().unwrap_or_default().to_string();
                auth_headers.lock().unwrap().push(value);
            }
            Ok::<Response, ErrorResponse>(response)
        };
        let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(tcp, callback).await else {
            return;
        };
        let index = self.accepted.fetch_add(1, Ordering::SeqCst);

        for frame in &self.burst {
            if ws.send(Message::Text(frame.clone())).await.is_err() {
                return;
            }
        }

        if let (0, Some(delay)) = (index, self.close_first_after) {
            tokio::time::sleep(delay).await;
            let _ = ws.close(None).await;
            return;
        }

        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let _ = self.frames.send(text);
            }
        }
    }
}
