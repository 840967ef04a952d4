// ── Core error types ──
//
// Session-level errors from pulse-core. Consumers never see raw socket
// or framing failures; the `From<pulse_api::Error>` impl translates
// wire errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to projector at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Projector did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Projector disconnected")]
    Disconnected,

    // ── Device errors ────────────────────────────────────────────────
    #[error("Request rejected by projector ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Unexpected reply from projector: {message}")]
    Protocol { message: String },

    // ── Wake errors ──────────────────────────────────────────────────
    #[error("Wake-on-LAN failed: {reason}")]
    WakeFailed { reason: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when the projector simply could not be reached, which is
    /// what a sleeping or powered-down projector looks like.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::Disconnected
        )
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<pulse_api::Error> for CoreError {
    fn from(err: pulse_api::Error) -> Self {
        match err {
            pulse_api::Error::Connect { host, port, source } => CoreError::ConnectionFailed {
                host: format!("{host}:{port}"),
                reason: source.to_string(),
            },
            pulse_api::Error::ConnectTimeout { timeout_secs, .. }
            | pulse_api::Error::LoginTimeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            pulse_api::Error::Io(_) | pulse_api::Error::Closed => CoreError::Disconnected,
            pulse_api::Error::Encode(e) => CoreError::Internal(e.to_string()),
            pulse_api::Error::Handshake { message } => CoreError::Protocol { message },
            pulse_api::Error::Rpc { code, message } => CoreError::Rejected { code, message },
            pulse_api::Error::InvalidMac { value } => CoreError::ValidationFailed {
                message: format!("invalid MAC address '{value}'"),
            },
            pulse_api::Error::WakeOnLan(e) => CoreError::WakeFailed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_are_unreachable() {
        let err = CoreError::from(pulse_api::Error::ConnectTimeout {
            host: "10.0.0.5".into(),
            port: 9090,
            timeout_secs: 20,
        });
        assert!(matches!(err, CoreError::Timeout { timeout_secs: 20 }));
        assert!(err.is_unreachable());

        let err = CoreError::from(pulse_api::Error::Connect {
            host: "10.0.0.5".into(),
            port: 9090,
            source: std::io::ErrorKind::ConnectionRefused.into(),
        });
        assert!(matches!(&err, CoreError::ConnectionFailed { host, .. } if host == "10.0.0.5:9090"));
        assert!(err.is_unreachable());
    }

    #[test]
    fn device_errors_are_not_unreachable() {
        let err = CoreError::from(pulse_api::Error::Rpc {
            code: -32601,
            message: "Method not found".into(),
        });
        assert!(matches!(err, CoreError::Rejected { code: -32601, .. }));
        assert!(!err.is_unreachable());
    }
}
