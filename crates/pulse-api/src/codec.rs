//! Request encoding and concatenated-frame decoding.
//!
//! The projector writes JSON objects back to back with nothing between
//! them, so a single read can carry several messages. Each one begins
//! with [`MESSAGE_PREFIX`]; [`decode`] splits on every occurrence after
//! the first and parses the fragments independently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::protocol::{JSONRPC_VERSION, MESSAGE_PREFIX, PROPERTY_CHANGED};

// ── Outbound ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
}

/// Serialize one request into its wire bytes.
pub fn encode(method: &str, params: &Value, id: u64) -> Result<Vec<u8>, Error> {
    let bytes = serde_json::to_vec(&Request {
        jsonrpc: JSONRPC_VERSION,
        method,
        params,
        id,
    })?;
    Ok(bytes)
}

// ── Inbound ─────────────────────────────────────────────────────────

/// Error object carried by a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl Default for RpcError {
    fn default() -> Self {
        Self {
            code: 0,
            message: "unspecified device error".into(),
            data: None,
        }
    }
}

/// One parsed inbound message: a response (has `id`) or a notification
/// (has `method`, no `id`). Every member is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Envelope {
    /// `true` when the message carries the expected version literal and
    /// no `error` member. Anything else is not a usable result.
    pub fn is_result(&self) -> bool {
        self.jsonrpc.as_deref() == Some(JSONRPC_VERSION) && self.error.is_none()
    }

    /// The device error, if this is an error response.
    pub fn rpc_error(&self) -> Option<RpcError> {
        self.error
            .as_ref()
            .map(|raw| serde_json::from_value(raw.clone()).unwrap_or_default())
    }

    pub fn is_property_changed(&self) -> bool {
        self.id.is_none() && self.method.as_deref() == Some(PROPERTY_CHANGED)
    }

    /// The `{name: value}` objects of a `property.changed` notification.
    pub fn changed_properties(&self) -> Vec<&Map<String, Value>> {
        self.params
            .as_ref()
            .and_then(|p| p.get("property"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }
}

/// Split a read buffer into message fragments.
///
/// Every fragment after the first keeps its leading [`MESSAGE_PREFIX`].
/// Whitespace around fragments is dropped; empty fragments are skipped.
pub fn split_frames(text: &str) -> Vec<&str> {
    let mut frames = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(MESSAGE_PREFIX) {
        if idx > start {
            frames.push(&text[start..idx]);
            start = idx;
        }
    }
    frames.push(&text[start..]);

    frames
        .into_iter()
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
        .collect()
}

/// Decode every message in a read buffer, in wire order.
///
/// A fragment that fails to parse is logged and dropped; the rest of the
/// buffer is still processed.
pub fn decode(buf: &[u8]) -> Vec<Envelope> {
    let text = String::from_utf8_lossy(buf);
    split_frames(&text)
        .into_iter()
        .filter_map(|frame| match serde_json::from_str::<Envelope>(frame) {
            Ok(envelope) => {
                tracing::trace!(frame, "<- frame");
                Some(envelope)
            }
            Err(e) => {
                tracing::warn!(error = %e, frame, "dropping undecodable fragment");
                None
            }
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────
