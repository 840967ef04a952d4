//! Clap derive structures for the `pulse` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pulse -- control Barco Pulse projectors from the command line
#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    version,
    about = "Control Barco Pulse projectors from the command line",
    long_about = "Talks JSON-RPC to a Barco Pulse projector on TCP port 9090.\n\n\
        Projectors in eco standby are woken with a wake-on-LAN packet when a\n\
        MAC address is configured; power-on is replayed once they answer.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Projector profile to use
    #[arg(long, short = 'p', env = "PULSE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Projector hostname or IP (overrides profile)
    #[arg(long, short = 'H', env = "PULSE_HOST", global = true)]
    pub host: Option<String>,

    /// JSON-RPC port (overrides profile)
    #[arg(long, env = "PULSE_PORT", global = true)]
    pub port: Option<u16>,

    /// MAC address for wake-on-LAN (overrides profile)
    #[arg(long, env = "PULSE_MAC", global = true)]
    pub mac: Option<String>,

    /// Seconds allowed for opening the TCP connection
    #[arg(long, env = "PULSE_CONNECT_TIMEOUT", global = true)]
    pub connect_timeout: Option<u64>,

    /// Seconds allowed for each handshake round trip and reply
    #[arg(long, env = "PULSE_LOGIN_TIMEOUT", global = true)]
    pub login_timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PULSE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe the projector and print its model and serial number
    Test,

    /// Show connection state, power, source, and sensor values
    #[command(alias = "st")]
    Status,

    /// Power the projector on, waking it first if needed
    On(OnArgs),

    /// Power the projector off
    Off,

    /// Put the projector in ready state
    Ready,

    /// Switch the main window to an input source
    Source(SourceArgs),

    /// List available input sources
    Sources,

    /// Read one or more properties
    Get(GetArgs),

    /// Write a property
    Set(SetArgs),

    /// Send a raw JSON-RPC request
    Send(SendArgs),

    /// Stream property changes until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Power ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OnArgs {
    /// Seconds to keep retrying while a woken projector boots (0 = don't wait)
    #[arg(long, default_value = "90")]
    pub wait: u64,
}

// ── Sources ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Source name as listed by `pulse sources` (e.g. "HDMI 1")
    pub name: String,
}

// ── Properties ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Dotted property paths (e.g. system.state)
    #[arg(required = true)]
    pub properties: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Dotted property path
    pub property: String,

    /// New value as JSON; bare words are sent as strings
    pub value: String,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// JSON-RPC method (e.g. system.gotoready)
    pub method: String,

    /// Params as JSON (defaults to [])
    pub params: Option<String>,

    /// Return once the request is written instead of waiting for the reply
    #[arg(long)]
    pub no_reply: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between state refreshes; also drives reconnects
    #[arg(long, short = 'i', default_value = "30")]
    pub interval: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile (prompts for anything not given)
    Init(InitArgs),

    /// Display the current configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    SetDefault {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Profile name (defaults to --profile, then "default")
    #[arg(long)]
    pub name: Option<String>,

    /// Never prompt; take host and MAC from --host and --mac only
    #[arg(long)]
    pub non_interactive: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
