use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `pulse-api` crate.
///
/// Covers every failure mode on the wire: TCP connect, the handshake
/// round trips, framing, device-side RPC errors, and the wake path.
/// `pulse-core` maps these into session-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect was refused or failed at the socket level.
    #[error("Connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete within the connect timeout.
    #[error("Connection to {host}:{port} timed out after {timeout_secs}s")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout_secs: u64,
    },

    /// A handshake round trip did not complete within the login timeout.
    #[error("Login timed out after {timeout_secs}s")]
    LoginTimeout { timeout_secs: u64 },

    /// Read or write on an established socket failed.
    #[error("Socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The projector closed the stream.
    #[error("Connection closed by peer")]
    Closed,

    // ── Protocol ────────────────────────────────────────────────────
    /// A request could not be serialized.
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The projector answered the handshake with something unusable.
    #[error("Handshake failed: {message}")]
    Handshake { message: String },

    /// The projector returned a JSON-RPC error object.
    #[error("Device error {code}: {message}")]
    Rpc { code: i64, message: String },

    // ── Wake-on-LAN ─────────────────────────────────────────────────
    /// The configured hardware address is not a 6-byte MAC.
    #[error("Invalid MAC address '{value}'")]
    InvalidMac { value: String },

    /// Sending the magic packet failed.
    #[error("Wake-on-LAN broadcast failed: {0}")]
    WakeOnLan(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn login_timeout(timeout: Duration) -> Self {
        Self::LoginTimeout {
            timeout_secs: timeout.as_secs(),
        }
    }

    /// Returns `true` if this error hit a configured deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::LoginTimeout { .. })
    }

    /// Returns `true` if the projector was unreachable or went away,
    /// which is the expected outcome while it sleeps.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. }
            | Self::ConnectTimeout { .. }
            | Self::LoginTimeout { .. }
            | Self::Closed => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
