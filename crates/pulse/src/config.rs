//! CLI configuration: thin wrapper around `pulse_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--host,
//! --mac, --port, timeouts) on top of the selected profile.

use pulse_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use pulse_config::{
    Config, Profile, config_path, load_config_or_default, profile_to_session_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Build a `SessionConfig` from the config file, profile, and CLI
/// overrides.
pub fn resolve_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config_or_default();
    resolve_from(&cfg, global)
}

fn resolve_from(cfg: &Config, global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly named profile must exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None if global.host.is_none() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        None => Profile::default(),
    };

    apply_overrides(&mut profile, global);
    Ok(profile_to_session_config(&profile, &cfg.defaults)?)
}

/// Flags (and their `PULSE_*` env fallbacks) win over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = Some(port);
    }
    if let Some(ref mac) = global.mac {
        profile.mac = Some(mac.clone());
    }
    if let Some(secs) = global.connect_timeout {
        profile.connect_timeout = Some(secs);
    }
    if let Some(secs) = global.login_timeout {
        profile.login_timeout = Some(secs);
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["pulse"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), profile);
        cfg
    }

    #[test]
    fn flags_override_profile_values() {
        let cfg = config_with(
            "default",
            Profile {
                host: "projector.lan".into(),
                mac: Some("00:11:22:33:44:55".into()),
                login_timeout: Some(3),
                ..Profile::default()
            },
        );

        let session = resolve_from(&cfg, &global(&["--host", "10.0.0.9", "--port", "9191"])).unwrap();
        assert_eq!(session.host, "10.0.0.9");
        assert_eq!(session.port, 9191);
        assert_eq!(session.login_timeout, Duration::from_secs(3));
        assert!(session.mac.is_some());
    }

    #[test]
    fn host_flag_works_without_a_profile() {
        let session = resolve_from(&Config::default(), &global(&["--host", "10.0.0.9"])).unwrap();
        assert_eq!(session.host, "10.0.0.9");
        assert_eq!(session.port, 9090);
        assert!(session.mac.is_none());
    }

    #[test]
    fn missing_config_without_host_is_reported() {
        let err = resolve_from(&Config::default(), &global(&[])).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn unknown_named_profile_lists_alternatives() {
        let cfg = config_with(
            "lobby",
            Profile {
                host: "10.0.0.5".into(),
                ..Profile::default()
            },
        );
        let err = resolve_from(&cfg, &global(&["--profile", "lab", "--host", "x"])).unwrap_err();
        assert!(
            matches!(&err, CliError::ProfileNotFound { name, available } if name == "lab" && available == "lobby")
        );
    }

    #[test]
    fn invalid_mac_flag_is_a_validation_error() {
        let err = resolve_from(
            &Config::default(),
            &global(&["--host", "10.0.0.9", "--mac", "not-a-mac"]),
        )
        .unwrap_err();
        assert!(matches!(&err, CliError::Validation { field, .. } if field == "mac"));
    }
}
