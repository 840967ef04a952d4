//! Wake-on-LAN for projectors in network standby.
//!
//! A sleeping projector drops its control port; the only way back is a
//! magic packet (6 x `0xFF` followed by the MAC repeated 16 times) sent
//! as a UDP broadcast.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Broadcast destination used when none is configured.
pub const DEFAULT_WAKE_TARGET: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, 9));

const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

// ── MacAddress ──────────────────────────────────────────────────────

/// Hardware address of the projector's network interface.
///
/// Parses colon-separated, dash-separated, or bare hex; always displays
/// as lowercase colon-separated (`aa:bb:cc:dd:ee:ff`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMac {
            value: s.to_owned(),
        };

        let hex: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        if hex.len() != 12 || !hex.is_ascii() {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (slot, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

// ── Magic packet ────────────────────────────────────────────────────

/// Build the 102-byte magic packet for `mac`.
pub fn magic_packet(mac: &MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFF; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac.0);
    }
    packet
}

/// Broadcast a magic packet to `target`.
///
/// The send runs on the blocking pool so the caller's task is never
/// parked on the socket.
pub async fn wake(mac: MacAddress, target: SocketAddr) -> Result<(), Error> {
    tracing::info!(%mac, %target, "sending wake-on-LAN packet");
    let packet = magic_packet(&mac);

    tokio::task::spawn_blocking(move || send_blocking(&packet, target))
        .await
        .map_err(|e| Error::WakeOnLan(std::io::Error::other(e)))?
}

fn send_blocking(packet: &[u8], target: SocketAddr) -> Result<(), Error> {
    let bind: SocketAddr = if target.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).map_err(Error::WakeOnLan)?;
    socket.set_broadcast(true).map_err(Error::WakeOnLan)?;
    socket.send_to(packet, target).map_err(Error::WakeOnLan)?;
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc];

    #[test]
    fn parse_colon_dash_and_bare_formats() {
        for raw in ["00:11:22:AA:BB:CC", "00-11-22-aa-bb-cc", "001122aabbcc"] {
            let mac: MacAddress = raw.parse().unwrap();
            assert_eq!(mac.octets(), MAC, "parsing {raw}");
        }
    }

    #[test]
    fn display_is_lowercase_colon() {
        let mac = MacAddress::from_bytes(MAC);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in ["", "00:11:22:aa:bb", "00:11:22:aa:bb:cc:dd", "zz:11:22:aa:bb:cc", "é0:11:22:aa:bb:c"] {
            assert!(
                matches!(raw.parse::<MacAddress>(), Err(Error::InvalidMac { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn serde_round_trips_through_string() {
        let mac: MacAddress = serde_json::from_str("\"00-11-22-AA-BB-CC\"").unwrap();
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"00:11:22:aa:bb:cc\"");
    }

    #[test]
    fn magic_packet_layout() {
        let packet = magic_packet(&MacAddress::from_bytes(MAC));
        assert_eq!(packet.len(), 102);
        assert!(packet[..6].iter().all(|&b| b == 0xFF));
        for repetition in packet[6..].chunks_exact(6) {
            assert_eq!(repetition, MAC);
        }
    }

    #[tokio::test]
    async fn wake_reaches_a_local_listener() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = receiver.local_addr().unwrap();

        wake(MacAddress::from_bytes(MAC), target).await.unwrap();

        let mut buf = [0u8; 128];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(len, 102);
        assert_eq!(&buf[6..12], &MAC);
    }
}
