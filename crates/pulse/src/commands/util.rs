//! Shared helpers for command handlers.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use pulse_core::{Delivery, DeviceSession};

use crate::error::CliError;

/// Close the link and stop the dispatcher.
pub async fn close(session: &DeviceSession) {
    session.disconnect().await;
    session.shutdown();
}

/// Wait until the cache holds `key`, bounded by `timeout`.
///
/// Bulk-fetch replies arrive after `ensure_connected` returns, so
/// readers of the cache give them a moment to land.
pub async fn wait_for_key(session: &DeviceSession, key: &str, timeout: Duration) -> bool {
    let mut stream = session.subscribe();
    if stream.current().contains(key) {
        return true;
    }

    tokio::time::timeout(timeout, async {
        while let Some(snapshot) = stream.changed().await {
            if snapshot.contains(key) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Parse a property value. Anything that isn't valid JSON is sent as a
/// string, so `pulse set image.window.main.source "HDMI 1"` works
/// without extra quoting.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Parse request params, which must be valid JSON.
pub fn parse_params(raw: Option<&str>) -> Result<Value, CliError> {
    let Some(raw) = raw else {
        return Ok(Value::Array(Vec::new()));
    };
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: "params".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

// ── Delivery reporting ──────────────────────────────────────────────

/// How a fire-and-forget command was disposed of, for output.
#[derive(Debug, Serialize)]
pub struct DeliveryView {
    pub action: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl DeliveryView {
    pub fn new(action: impl Into<String>, delivery: Delivery) -> Self {
        let (status, id) = match delivery {
            Delivery::Sent { id } => ("sent", Some(id)),
            Delivery::Replayed => ("replayed", None),
            Delivery::Deferred => ("deferred", None),
        };
        Self {
            action: action.into(),
            status,
            id,
        }
    }

    pub fn message(&self) -> String {
        match (self.status, self.id) {
            ("sent", Some(id)) => format!("✓ {} sent (request {id})", self.action),
            ("replayed", _) => format!("✓ Projector woke up, {} sent", self.action),
            _ => format!(
                "… Wake packet sent; {} was not delivered because the projector is still \
                 booting. Retry shortly or use --wait.",
                self.action
            ),
        }
    }
}
