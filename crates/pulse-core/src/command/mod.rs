// ── Command API ──
//
// Every device-bound operation flows through the `Command` enum. The
// session routes each variant through the wake path, the connection
// lock, and finally the request writer.

mod tracker;

use serde_json::{Value, json};

use pulse_api::protocol::{
    PROPERTY_GET, PROPERTY_SET, SYSTEM_GOTOREADY, SYSTEM_POWEROFF, SYSTEM_POWERON,
};

use crate::model::property::MAIN_SOURCE;

pub use tracker::{PendingRequest, RequestTracker};
pub(crate) use tracker::Reply;

/// All operations a caller can ask of the projector.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Power ────────────────────────────────────────────────────────
    PowerOn,
    PowerOff,
    GoToReady,

    // ── Image ────────────────────────────────────────────────────────
    SelectSource { name: String },

    // ── Properties ───────────────────────────────────────────────────
    GetProperties { properties: Vec<String> },
    SetProperty { property: String, value: Value },

    // ── Escape hatch ─────────────────────────────────────────────────
    Raw { method: String, params: Value },
}

impl Command {
    pub fn method(&self) -> &str {
        match self {
            Self::PowerOn => SYSTEM_POWERON,
            Self::PowerOff => SYSTEM_POWEROFF,
            Self::GoToReady => SYSTEM_GOTOREADY,
            Self::SelectSource { .. } | Self::SetProperty { .. } => PROPERTY_SET,
            Self::GetProperties { .. } => PROPERTY_GET,
            Self::Raw { method, .. } => method,
        }
    }

    pub fn params(&self) -> Value {
        match self {
            Self::PowerOn | Self::PowerOff | Self::GoToReady => json!([]),
            Self::SelectSource { name } => json!({"property": MAIN_SOURCE, "value": name}),
            Self::GetProperties { properties } => json!({"property": properties}),
            Self::SetProperty { property, value } => json!({"property": property, "value": value}),
            Self::Raw { params, .. } => params.clone(),
        }
    }

    /// `true` when a sleeping projector must be woken before this
    /// command can reach it.
    pub fn requires_wake(&self) -> bool {
        pulse_api::protocol::requires_wake(self.method())
    }
}
