// ── Runtime session configuration ──
//
// These types describe *how* to reach one projector and how to read its
// power state. They never touch disk; the CLI or any other consumer
// builds a `SessionConfig` and hands it in.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pulse_api::protocol::{CONNECT_TIMEOUT, DEFAULT_PORT, LOGIN_TIMEOUT};
use pulse_api::wol::DEFAULT_WAKE_TARGET;
use pulse_api::{MacAddress, TransportConfig};

use crate::model::property::{SYSTEM_STATE, SYSTEM_TARGETSTATE};

/// One of the two properties that report the projector's power state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StateProperty {
    /// `system.state`: where the projector is right now.
    State,
    /// `system.targetstate`: where it was last told to go.
    TargetState,
}

impl StateProperty {
    pub fn path(self) -> &'static str {
        match self {
            Self::State => SYSTEM_STATE,
            Self::TargetState => SYSTEM_TARGETSTATE,
        }
    }
}

/// Predicate for "the projector is going to sleep".
///
/// Fires when one of `properties` changes to `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepDetection {
    pub properties: Vec<StateProperty>,
    pub value: String,
}

impl Default for SleepDetection {
    fn default() -> Self {
        Self {
            properties: vec![StateProperty::State, StateProperty::TargetState],
            value: "eco".into(),
        }
    }
}

impl SleepDetection {
    pub fn watches(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p.path() == property)
    }

    pub fn is_sleep_value(&self, value: &Value) -> bool {
        value.as_str() == Some(self.value.as_str())
    }
}

/// Configuration for one projector session.
///
/// Built by CLI/config, passed to `DeviceSession` -- core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hostname or IP address of the projector.
    pub host: String,
    /// JSON-RPC control port.
    pub port: u16,
    /// Hardware address for wake-on-LAN. Without it, sleeping
    /// projectors cannot be woken.
    pub mac: Option<MacAddress>,
    /// Bound on opening the TCP connection.
    pub connect_timeout: Duration,
    /// Bound on each handshake round trip and on awaited calls.
    pub login_timeout: Duration,
    /// Where magic packets are sent.
    pub wake_target: SocketAddr,
    /// Property `is_on` reads.
    pub power_property: StateProperty,
    /// When to consider the projector asleep.
    pub sleep: SleepDetection,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            mac: None,
            connect_timeout: CONNECT_TIMEOUT,
            login_timeout: LOGIN_TIMEOUT,
            wake_target: DEFAULT_WAKE_TARGET,
            power_property: StateProperty::TargetState,
            sleep: SleepDetection::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.mac = Some(mac);
        self
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            port: self.port,
            connect_timeout: self.connect_timeout,
            login_timeout: self.login_timeout,
        }
    }
}
