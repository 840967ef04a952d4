//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg)
        .map(|s| s.trim_end().to_owned())
        .unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

#[derive(Debug, Serialize)]
struct ProfileEntry {
    name: String,
    default: bool,
    host: String,
    mac: Option<String>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "MAC")]
    mac: String,
}

fn profile_entries(cfg: &Config) -> Vec<ProfileEntry> {
    let default = cfg.active_profile_name();
    let mut entries: Vec<ProfileEntry> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileEntry {
            name: name.clone(),
            default: name == default,
            host: p.host.clone(),
            mac: p.mac.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

// ── Init ────────────────────────────────────────────────────────────

/// Merge `args` and the global --host/--mac into `cfg`, prompting for
/// what's missing when allowed to. Returns the profile name written.
fn init_profile(
    cfg: &mut Config,
    args: &InitArgs,
    global: &GlobalOpts,
    interactive: bool,
) -> Result<String, CliError> {
    let name = args
        .name
        .clone()
        .or_else(|| global.profile.clone())
        .unwrap_or_else(|| "default".into());
    let existing = cfg.profiles.get(&name).cloned().unwrap_or_default();

    let host = match global.host.clone() {
        Some(host) => host,
        None if interactive => {
            let mut prompt = Input::<String>::new().with_prompt("Projector host or IP");
            if !existing.host.is_empty() {
                prompt = prompt.default(existing.host.clone());
            }
            prompt.interact_text().map_err(prompt_err)?
        }
        None if !existing.host.is_empty() => existing.host.clone(),
        None => {
            return Err(CliError::Validation {
                field: "host".into(),
                reason: "required; pass --host".into(),
            });
        }
    };

    let mac = match global.mac.clone() {
        Some(mac) => Some(mac),
        None if interactive => {
            let answer: String = Input::new()
                .with_prompt("MAC address for wake-on-LAN (blank to skip)")
                .default(existing.mac.clone().unwrap_or_default())
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            Some(answer).filter(|m| !m.trim().is_empty())
        }
        None => existing.mac.clone(),
    };
    if let Some(ref mac) = mac {
        pulse_config::parse_mac(mac)?;
    }

    let profile = Profile {
        host: host.trim().to_owned(),
        mac,
        port: global.port.or(existing.port),
        ..existing
    };
    pulse_config::profile_to_session_config(&profile, &cfg.defaults)?;

    if cfg.profiles.is_empty() {
        cfg.default_profile = Some(name.clone());
    }
    cfg.profiles.insert(name.clone(), profile);
    Ok(name)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => {
            let path = config::config_path();
            let interactive = !init.non_interactive && std::io::stdin().is_terminal();
            if interactive {
                eprintln!("Pulse projector setup");
                eprintln!("   Config path: {}\n", path.display());
            }

            let mut cfg = config::load_config_or_default();
            let name = init_profile(&mut cfg, &init, global, interactive)?;
            save_config(&cfg)?;

            eprintln!("✓ Profile '{name}' written to {}", path.display());
            eprintln!("  Test it: pulse --profile {name} test");
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.active_profile_name().to_owned()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let entries = profile_entries(&cfg);
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*" } else { "" },
                    name: e.name.clone(),
                    host: e.host.clone(),
                    mac: e.mac.clone().unwrap_or_else(|| "-".into()),
                },
                |e| e.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetDefault { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn parse(args: &[&str]) -> (InitArgs, GlobalOpts) {
        let mut argv = vec!["pulse", "config", "init", "--non-interactive"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Config(ConfigArgs {
            command: ConfigCommand::Init(init),
        }) = cli.command
        else {
            panic!("expected config init");
        };
        (init, cli.global)
    }

    #[test]
    fn first_profile_becomes_default() {
        let mut cfg = Config {
            default_profile: None,
            ..Config::default()
        };
        let (init, global) = parse(&["--name", "lobby", "--host", "10.0.0.5"]);

        let name = init_profile(&mut cfg, &init, &global, false).unwrap();
        assert_eq!(name, "lobby");
        assert_eq!(cfg.default_profile.as_deref(), Some("lobby"));
        assert_eq!(cfg.profiles["lobby"].host, "10.0.0.5");
    }

    #[test]
    fn reinit_keeps_existing_fields() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                host: "10.0.0.5".into(),
                mac: Some("00:11:22:33:44:55".into()),
                sleep_value: Some("standby".into()),
                ..Profile::default()
            },
        );
        let (init, global) = parse(&["--port", "9191"]);

        init_profile(&mut cfg, &init, &global, false).unwrap();
        let profile = &cfg.profiles["default"];
        assert_eq!(profile.host, "10.0.0.5");
        assert_eq!(profile.port, Some(9191));
        assert_eq!(profile.mac.as_deref(), Some("00:11:22:33:44:55"));
        assert_eq!(profile.sleep_value.as_deref(), Some("standby"));
    }

    #[test]
    fn host_is_required_without_prompting() {
        let mut cfg = Config::default();
        let (init, global) = parse(&[]);
        let err = init_profile(&mut cfg, &init, &global, false).unwrap_err();
        assert!(matches!(&err, CliError::Validation { field, .. } if field == "host"));
    }

    #[test]
    fn bad_mac_is_rejected_before_saving() {
        let mut cfg = Config::default();
        let (init, global) = parse(&["--host", "10.0.0.5", "--mac", "zz:zz"]);
        let err = init_profile(&mut cfg, &init, &global, false).unwrap_err();
        assert!(matches!(&err, CliError::Validation { field, .. } if field == "mac"));
        assert!(cfg.profiles.is_empty());
    }
}
