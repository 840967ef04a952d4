//! Fixed literals of the Pulse control protocol.
//!
//! Method names, the version literal, and the message-start marker the
//! projector repeats at the head of every object it writes.

use std::time::Duration;

/// TCP port the projector's JSON-RPC service listens on.
pub const DEFAULT_PORT: u16 = 9090;

/// Upper bound on opening the TCP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on each handshake round trip (identity probe, subscribe ack).
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Value of the `jsonrpc` member on every request and accepted reply.
pub const JSONRPC_VERSION: &str = "2.0";

/// Literal every inbound message starts with. The device concatenates
/// objects with no other delimiter, so this is the only frame boundary.
pub const MESSAGE_PREFIX: &str = "{\"jsonrpc\"";

// ── Methods ─────────────────────────────────────────────────────────

pub const PROPERTY_GET: &str = "property.get";
pub const PROPERTY_SET: &str = "property.set";
pub const PROPERTY_SUBSCRIBE: &str = "property.subscribe";
pub const PROPERTY_CHANGED: &str = "property.changed";
pub const SYSTEM_POWERON: &str = "system.poweron";
pub const SYSTEM_POWEROFF: &str = "system.poweroff";
pub const SYSTEM_GOTOREADY: &str = "system.gotoready";
pub const IMAGE_SOURCE_LIST: &str = "image.source.list";

/// Methods that can only reach a sleeping projector after a wake packet.
pub fn requires_wake(method: &str) -> bool {
    matches!(method, SYSTEM_POWERON | SYSTEM_GOTOREADY)
}
