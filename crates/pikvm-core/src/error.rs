//! Error taxonomy shared by every layer of the client.
//!
//! | Variant          | Raised when                                                |
//! |------------------|------------------------------------------------------------|
//! | `Auth`           | HTTP 401/403, or the login call reports failure            |
//! | `Api`            | The device answered with `{"ok": false, ...}`              |
//! | `HttpStatus`     | Any other non-2xx HTTP status                              |
//! | `Transport`      | Network, TLS or WebSocket failure                          |
//! | `InvalidResponse`| The body could not be decoded as an envelope               |
//! | `NotConnected`   | The session was closed, or no WebSocket could be used      |
//! | `Io`             | Reading an upload or writing a screenshot on local disk    |
//! | `BridgeStopped`  | Work was submitted to a stopped execution bridge           |
//!
//! `HttpStatus` and `Transport` together form the "generic transport error"
//! class; see [`KvmError::is_transport`].

use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error carried by [`KvmError::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, KvmError>;

/// Every failure the client can report.
#[derive(Debug, Error)]
pub enum KvmError {
    /// Credentials were rejected (401), access was forbidden (403) or the
    /// login endpoint reported failure.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The device processed the request but reported a logical failure.
    #[error("device API error {code}: {message}")]
    Api {
        /// Machine-readable error identifier (`result.error`).
        code: String,
        /// Human-readable description (`result.error_msg`).
        message: String,
    },

    /// The device answered with a non-success status other than 401/403.
    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    /// The request never produced a usable response.
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The response body was not a well-formed envelope.
    #[error("malformed device response: {0}")]
    InvalidResponse(String),

    /// The session has been closed or the WebSocket is unavailable.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// A local file operation failed.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The execution bridge is not accepting work.
    #[error("execution bridge is not running")]
    BridgeStopped,
}

impl KvmError {
    /// Wraps a lower-level error with a short description of what was being
    /// attempted.
    pub fn transport(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for the generic transport class (`HttpStatus` or
    /// `Transport`), as opposed to authentication or device-reported errors.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::HttpStatus { .. } | Self::Transport { .. })
    }

    /// Returns `true` for [`KvmError::Auth`].
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
