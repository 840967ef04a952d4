// ── Connection state ──

use serde::Serialize;

/// Lifecycle of the session's link to the projector.
///
/// `Disconnected → Connecting → Online ⇄ Sleeping → Disconnected`.
/// Only the session moves between states; consumers observe them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Online,
    /// Socket still open, projector in eco standby.
    Sleeping,
}

impl ConnectionState {
    /// `true` while a socket is established and handshaken.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Online | Self::Sleeping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ConnectionState::Sleeping.to_string(), "sleeping");
        assert_eq!(ConnectionState::Online.to_string(), "online");
    }

    #[test]
    fn sleeping_counts_as_connected() {
        assert!(ConnectionState::Sleeping.is_connected());
        assert!(ConnectionState::Online.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
    }
}
