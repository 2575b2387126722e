//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use smsrelay_config::ConfigError;
use smsrelay_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Credentials ──────────────────────────────────────────────────
    #[error("Missing {credential} for profile '{profile}'")]
    #[diagnostic(
        code(smsrelay::no_credentials),
        help(
            "Pass --{credential} or set {env_var}.\n\
             Profiles can also set {credential} in the config file."
        )
    )]
    MissingCredential {
        credential: &'static str,
        env_var: &'static str,
        profile: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(smsrelay::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(smsrelay::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(
        code(smsrelay::config),
        help("Check the config file syntax and any SMSRELAY_* environment overrides.")
    )]
    Config(ConfigError),

    // ── Transport ────────────────────────────────────────────────────
    #[error("MQTT {stage} failed: {reason}")]
    #[diagnostic(
        code(smsrelay::transport),
        help(
            "Check that the broker is reachable and the credentials are valid.\n\
             Use --reconnect-delay to keep retrying instead of exiting."
        )
    )]
    Transport { stage: &'static str, reason: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingCredential { .. }
            | Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::Config(_) => exit_code::USAGE,
            Self::Transport { .. } => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Transport { stage, reason } => CliError::Transport { stage, reason },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredential {
                credential,
                profile,
            } => CliError::MissingCredential {
                credential,
                env_var: credential_env_var(credential),
                profile,
            },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other @ ConfigError::Figment(_) => CliError::Config(other),
        }
    }
}

fn credential_env_var(credential: &str) -> &'static str {
    match credential {
        "password" => "MQTT_PASSWORD",
        _ => "MQTT_USERNAME",
    }
}
