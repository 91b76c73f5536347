//! Decoder for the device's uniform HTTP response envelope.
//!
//! Every `/api/...` endpoint answers with the same JSON wrapper:
//!
//! ```json
//! {"ok": true,  "result": {"hw": {...}, "system": {...}}}
//! {"ok": false, "result": {"error": "MsdIsBusyError", "error_msg": "Performing another MSD operation"}}
//! ```
//!
//! The body is decoded exactly once, at the boundary, into [`Envelope`].  The
//! rest of the client only ever sees a `serde_json::Value` payload or a typed
//! [`KvmError`].
//!
//! # Decoding order
//!
//! 1. status 401 → `Auth("Authentication failed")`
//! 2. status 403 → `Auth("Forbidden")`
//! 3. any other status outside `200..=299` → `HttpStatus { status }`
//! 4. `ok == false` → `Api { code, message }`, defaulting to
//!    `"UnknownError"` / `"Unknown error"` when the fields are missing
//! 5. otherwise the `result` payload, or `{}` when it is absent

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{KvmError, Result};

/// Error code reported when a failed envelope carries no `error` field.
pub const UNKNOWN_ERROR_CODE: &str = "UnknownError";

/// Error message reported when a failed envelope carries no `error_msg` field.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `ok == true`; holds the `result` payload.
    Success(Value),
    /// `ok == false`; holds the device's error identifier and description.
    Failure { code: String, message: String },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
}

impl Envelope {
    /// Parses a response body into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`KvmError::InvalidResponse`] if the body is not a JSON object
    /// with the expected fields.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| KvmError::InvalidResponse(format!("not a response envelope: {e}")))?;

        if raw.ok {
            return Ok(Self::Success(
                raw.result.unwrap_or_else(|| Value::Object(Map::new())),
            ));
        }

        let result = raw.result.unwrap_or(Value::Null);
        let text_field = |key: &str, default: &str| {
            result
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        Ok(Self::Failure {
            code: text_field("error", UNKNOWN_ERROR_CODE),
            message: text_field("error_msg", UNKNOWN_ERROR_MESSAGE),
        })
    }

    /// Converts the envelope into the payload or an [`KvmError::Api`].
    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Failure { code, message } => Err(KvmError::Api { code, message }),
        }
    }
}

/// Maps an HTTP status code onto the error taxonomy.
///
/// Used on its own for binary endpoints (the snapshot), whose body is not an
/// envelope.
pub fn check_status(status: u16) -> Result<()> {
    match status {
        401 => Err(KvmError::Auth("Authentication failed".to_string())),
        403 => Err(KvmError::Auth("Forbidden".to_string())),
        200..=299 => Ok(()),
        other => Err(KvmError::HttpStatus { status: other }),
    }
}

/// Decodes an HTTP response (status + body) into its result payload.
///
/// # Example
///
/// ```rust
/// use pikvm_core::decode_envelope;
///
/// let payload = decode_envelope(200, br#"{"ok": true, "result": {"online": true}}"#).unwrap();
/// assert_eq!(payload["online"], true);
/// ```
pub fn decode_envelope(status: u16, body: &[u8]) -> Result<Value> {
    check_status(status)?;
    Envelope::parse(body)?.into_result()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
