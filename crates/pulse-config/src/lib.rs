//! Shared configuration for Pulse tools.
//!
//! TOML profiles (one per projector), layered with `PULSE_*` environment
//! overrides, and translation to `pulse_core::SessionConfig`. The CLI
//! adds `GlobalOpts`-aware flag overrides on top.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulse_core::{MacAddress, SessionConfig, SleepDetection, StateProperty};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named projector profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Seconds allowed for opening the TCP connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Seconds allowed for each handshake round trip.
    #[serde(default = "default_login_timeout")]
    pub login_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            connect_timeout: default_connect_timeout(),
            login_timeout: default_login_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_connect_timeout() -> u64 {
    20
}
fn default_login_timeout() -> u64 {
    5
}

/// A named projector profile.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Hostname or IP address of the projector.
    pub host: String,

    /// Override the JSON-RPC port (9090).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// MAC address used for wake-on-LAN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    /// Broadcast address:port for wake packets (`255.255.255.255:9`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_target: Option<String>,

    /// Override connect timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Override login timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_timeout: Option<u64>,

    /// Property read for "is on": "state" or "targetstate".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_property: Option<String>,

    /// Properties watched for the sleep value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_properties: Option<Vec<String>>,

    /// Value that means the projector is going to sleep ("eco").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_value: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "pulse", "pulse").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pulse");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, then layer `PULSE_*` variables on top
/// (`PULSE_DEFAULTS__OUTPUT=json`, `PULSE_PROFILES__LAB__HOST=...`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PULSE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Session translation ─────────────────────────────────────────────

/// Build a `SessionConfig` from a profile and the global defaults.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(invalid("host", "must not be empty".into()));
    }

    let mut config = SessionConfig::new(profile.host.trim());
    if let Some(port) = profile.port {
        config.port = port;
    }
    config.connect_timeout =
        Duration::from_secs(profile.connect_timeout.unwrap_or(defaults.connect_timeout));
    config.login_timeout =
        Duration::from_secs(profile.login_timeout.unwrap_or(defaults.login_timeout));

    if let Some(ref mac) = profile.mac {
        config.mac = Some(parse_mac(mac)?);
    }
    if let Some(ref target) = profile.wake_target {
        config.wake_target = parse_wake_target(target)?;
    }
    if let Some(ref property) = profile.power_property {
        config.power_property = parse_state_property("power_property", property)?;
    }

    let mut sleep = SleepDetection::default();
    if let Some(ref properties) = profile.sleep_properties {
        sleep.properties = properties
            .iter()
            .map(|p| parse_state_property("sleep_properties", p))
            .collect::<Result<_, _>>()?;
    }
    if let Some(ref value) = profile.sleep_value {
        sleep.value.clone_from(value);
    }
    config.sleep = sleep;

    Ok(config)
}

pub fn parse_mac(raw: &str) -> Result<MacAddress, ConfigError> {
    raw.parse()
        .map_err(|_| invalid("mac", format!("expected six hex octets, got '{raw}'")))
}

pub fn parse_wake_target(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse()
        .map_err(|_| invalid("wake_target", format!("expected address:port, got '{raw}'")))
}

fn parse_state_property(field: &str, raw: &str) -> Result<StateProperty, ConfigError> {
    raw.parse().map_err(|_| {
        invalid(
            field,
            format!("expected 'state' or 'targetstate', got '{raw}'"),
        )
    })
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason,
    }
}
