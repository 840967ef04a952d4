//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pulse_config::ConfigError;
use pulse_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to projector at {host}")]
    #[diagnostic(
        code(pulse::connection_failed),
        help(
            "Check that the projector is powered and reachable on its control port.\n\
             A projector in eco standby only answers after wake-on-LAN:\n\
             set its MAC with --mac or `pulse config init`.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("Projector connection was lost")]
    #[diagnostic(
        code(pulse::disconnected),
        help("The projector closed the connection. Retry, or run `pulse test`.")
    )]
    Disconnected,

    #[error("Projector did not respond within {seconds}s")]
    #[diagnostic(
        code(pulse::timeout),
        help("Increase --login-timeout or --connect-timeout, or check the projector.")
    )]
    Timeout { seconds: u64 },

    #[error("Wake-on-LAN failed: {reason}")]
    #[diagnostic(
        code(pulse::wake_failed),
        help("Check the MAC address and that broadcasts are allowed on this network.")
    )]
    WakeFailed { reason: String },

    // ── Device ───────────────────────────────────────────────────────

    #[error("Projector rejected the request ({code}): {message}")]
    #[diagnostic(code(pulse::rejected))]
    Rejected { code: i64, message: String },

    #[error("Unexpected reply from projector: {message}")]
    #[diagnostic(code(pulse::protocol))]
    Protocol { message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(pulse::not_found),
        help("Run: pulse {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pulse::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pulse::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pulse config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No projector configured")]
    #[diagnostic(
        code(pulse::no_config),
        help(
            "Create a profile with: pulse config init\n\
             Or pass --host / set PULSE_HOST.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(pulse::config))]
    Config(ConfigError),

    // ── Internal / IO ────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(pulse::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected | Self::WakeFailed { .. } => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => Self::ConnectionFailed { host, reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Disconnected => Self::Disconnected,
            CoreError::Rejected { code, message } => Self::Rejected { code, message },
            CoreError::Protocol { message } => Self::Protocol { message },
            CoreError::WakeFailed { reason } => Self::WakeFailed { reason },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_projector_exits_with_connection_code() {
        let err = CliError::from(CoreError::ConnectionFailed {
            host: "10.0.0.5:9090".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
        assert_eq!(
            CliError::from(CoreError::Disconnected).exit_code(),
            exit_code::CONNECTION
        );
    }

    #[test]
    fn timeouts_and_rejections_have_distinct_codes() {
        let timeout = CliError::from(CoreError::Timeout { timeout_secs: 5 });
        assert!(matches!(timeout, CliError::Timeout { seconds: 5 }));
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let rejected = CliError::from(CoreError::Rejected {
            code: -32601,
            message: "Method not found".into(),
        });
        assert_eq!(rejected.exit_code(), exit_code::REJECTED);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "mac".into(),
            reason: "expected six hex octets".into(),
        });
        assert!(matches!(&err, CliError::Validation { field, .. } if field == "mac"));
        assert_eq!(err.exit_code(), exit_code::USAGE);

        let err = CliError::from(ConfigError::UnknownProfile {
            profile: "lab".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
