//! Configuration file handling for smsrelay.
//!
//! TOML profiles (one per broker), a `[defaults]` table for pipeline
//! settings, and credential resolution (env + plaintext). The binary layers
//! CLI flags on top; nothing in `smsrelay-core` reads these types.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smsrelay_api::QoS;
use smsrelay_core::{DEFAULT_RECONNECT_DELAY_SECS, DecodeErrorPolicy};

/// Prefix for environment overrides, e.g. `SMSRELAY_DEFAULTS__UTC=true`.
pub const ENV_PREFIX: &str = "SMSRELAY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {credential} configured for profile '{profile}'")]
    MissingCredential {
        credential: &'static str,
        profile: String,
    },

    #[error("profile '{name}' not found in configuration (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Pipeline and session defaults shared by every profile.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named broker profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default)]
    pub errors: DecodeErrorPolicy,

    #[serde(default)]
    pub raw_payload: bool,

    #[serde(default)]
    pub utc: bool,

    /// Seconds; zero or negative disables reconnecting.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: f64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub qos: QoS,

    #[serde(default = "default_keepalive")]
    pub keepalive: u64,

    /// External notifier, e.g. `notify-send -a smsrelay`.
    pub notify_command: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            errors: DecodeErrorPolicy::default(),
            raw_payload: false,
            utc: false,
            reconnect_delay: default_reconnect_delay(),
            log_level: default_log_level(),
            qos: QoS::default(),
            keepalive: default_keepalive(),
            notify_command: None,
        }
    }
}

fn default_encoding() -> String {
    "utf-8".into()
}
fn default_reconnect_delay() -> f64 {
    DEFAULT_RECONNECT_DELAY_SECS
}
fn default_log_level() -> String {
    "INFO".into()
}
fn default_keepalive() -> u64 {
    60
}

/// A named broker profile. Unset fields fall back to flags or built-ins.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    pub host: Option<String>,

    pub port: Option<u16>,

    pub username: Option<String>,

    /// Plaintext password. Prefer `password_env`.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    pub client_id: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "smsrelay", "smsrelay").map_or_else(
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
    p.push("smsrelay");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the platform path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; a malformed one is.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Profile selection ───────────────────────────────────────────────

impl Config {
    /// Pick the active profile.
    ///
    /// An explicitly requested profile must exist. Otherwise the configured
    /// `default_profile` is used when present, and running without any
    /// profile is fine.
    pub fn select_profile(
        &self,
        requested: Option<&str>,
    ) -> Result<Option<(String, &Profile)>, ConfigError> {
        if let Some(name) = requested {
            return self
                .profiles
                .get(name)
                .map(|p| Some((name.to_owned(), p)))
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_owned(),
                    available: self.profile_names(),
                });
        }

        Ok(self
            .default_profile
            .as_deref()
            .and_then(|name| self.profiles.get(name).map(|p| (name.to_owned(), p))))
    }

    fn profile_names(&self) -> String {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        if names.is_empty() {
            return "none".into();
        }
        names.sort_unstable();
        names.join(", ")
    }
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve a profile password: `password_env` first, then plaintext.
pub fn resolve_password(profile: &Profile) -> Option<SecretString> {
    resolve_password_with(profile, |name| std::env::var(name).ok())
}

/// [`resolve_password`] with an explicit environment lookup.
pub fn resolve_password_with(
    profile: &Profile,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    // 1. Profile's password_env → env var lookup
    if let Some(value) = profile.password_env.as_deref().and_then(&lookup) {
        return Some(SecretString::from(value));
    }

    // 2. Plaintext in config
    profile.password.clone().map(SecretString::from)
}

/// Error for a credential that neither flags nor the profile supplied.
pub fn missing_credential(credential: &'static str, profile: Option<&str>) -> ConfigError {
    ConfigError::MissingCredential {
        credential,
        profile: profile.unwrap_or("<none>").to_owned(),
    }
}
