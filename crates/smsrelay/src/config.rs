//! Translation of CLI flags + config file into a `RelayConfig`.
//!
//! Precedence for every setting: flag (or its env var) > selected profile >
//! `[defaults]` table > built-in default. This is the single boundary where
//! CLI and file types cross into core types.

use std::time::Duration;

use secrecy::SecretString;
use smsrelay_api::{ConnectOptions, QoS};
use smsrelay_config::{Config, missing_credential, resolve_password};
use smsrelay_core::{
    CoreError, DecodeOptions, PipelineOptions, ReconnectPolicy, RelayConfig, TextEncoding,
    parse_topics,
};
use tracing::level_filters::LevelFilter;

use crate::cli::Cli;
use crate::error::CliError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 1883;

/// Everything `main` needs after startup validation.
#[derive(Debug)]
pub struct Settings {
    pub relay: RelayConfig,
    pub log_level: LevelFilter,
    pub notify_command: Option<String>,
}

/// Resolve and validate all settings. Any failure here is a usage error and
/// happens before a connection is attempted.
pub fn resolve_settings(cli: &Cli, file: &Config) -> Result<Settings, CliError> {
    let selected = file.select_profile(cli.profile.as_deref())?;
    let (profile_name, profile) = match &selected {
        Some((name, profile)) => (Some(name.as_str()), Some(*profile)),
        None => (None, None),
    };
    let defaults = &file.defaults;

    // 1. Credentials (flag > env > profile)
    let username = cli
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()))
        .ok_or_else(|| missing_credential("username", profile_name))?;
    let password = cli
        .password
        .clone()
        .map(SecretString::from)
        .or_else(|| profile.and_then(resolve_password))
        .ok_or_else(|| missing_credential("password", profile_name))?;

    // 2. Session
    let connect = ConnectOptions {
        host: cli
            .host
            .clone()
            .or_else(|| profile.and_then(|p| p.host.clone()))
            .unwrap_or_else(|| DEFAULT_HOST.into()),
        port: cli
            .port
            .or_else(|| profile.and_then(|p| p.port))
            .unwrap_or(DEFAULT_PORT),
        username,
        password,
        client_id: cli
            .client_id
            .clone()
            .or_else(|| profile.and_then(|p| p.client_id.clone()))
            .unwrap_or_else(random_client_id),
        keepalive: Duration::from_secs(cli.keepalive.unwrap_or(defaults.keepalive)),
    };
    connect.validate().map_err(CoreError::from)?;

    let topics = if cli.topics.is_empty() {
        parse_topics(profile.map_or(&[][..], |p| p.topics.as_slice()))
    } else {
        parse_topics(&cli.topics)
    };

    let qos = match cli.qos {
        Some(level) => QoS::try_from(level).map_err(|e| CliError::Validation {
            field: "qos".into(),
            reason: e.to_string(),
        })?,
        None => defaults.qos,
    };

    // 3. Pipeline
    let encoding: TextEncoding = cli
        .encoding
        .as_deref()
        .unwrap_or(&defaults.encoding)
        .parse()
        .map_err(CoreError::from)?;

    let pipeline = PipelineOptions {
        decode: DecodeOptions {
            encoding,
            errors: cli.errors.unwrap_or(defaults.errors),
            raw_payload: cli.raw_payload || defaults.raw_payload,
        },
        use_utc: cli.utc || defaults.utc,
    };

    let reconnect =
        ReconnectPolicy::from_secs_f64(cli.reconnect_delay.unwrap_or(defaults.reconnect_delay));

    // 4. Logging and notifier
    let log_level = parse_log_level(cli.log_level.as_deref().unwrap_or(&defaults.log_level))?;
    let notify_command = cli
        .notify_command
        .clone()
        .or_else(|| defaults.notify_command.clone());

    Ok(Settings {
        relay: RelayConfig {
            connect,
            topics,
            qos,
            pipeline,
            reconnect,
        },
        log_level,
        notify_command,
    })
}

/// `smsrelay-` plus 12 hex digits, short enough for MQTT 3.1 brokers that
/// cap client ids at 23 bytes.
fn random_client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("smsrelay-{}", id.get(..12).unwrap_or(&id))
}

/// Parse a log level name or number.
///
/// Names are case-insensitive and include the `WARNING`/`CRITICAL` spellings.
/// Numbers use the classic 10-step scale: `<=5` trace, `<=10` debug, `<=20`
/// info, `<=30` warn, anything higher error.
pub fn parse_log_level(raw: &str) -> Result<LevelFilter, CliError> {
    let value = raw.trim();

    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        let level: u64 = value.parse().unwrap_or(u64::MAX);
        return Ok(match level {
            0..=5 => LevelFilter::TRACE,
            6..=10 => LevelFilter::DEBUG,
            11..=20 => LevelFilter::INFO,
            21..=30 => LevelFilter::WARN,
            _ => LevelFilter::ERROR,
        });
    }

    match value.to_ascii_uppercase().as_str() {
        "TRACE" | "NOTSET" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::ERROR),
        "OFF" => Ok(LevelFilter::OFF),
        _ => Err(CliError::Validation {
            field: "log level".into(),
            reason: format!(
                "unknown level '{raw}' (expected TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL or a number)"
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::Parser;
    use secrecy::ExposeSecret;
    use smsrelay_config::Profile;
    use smsrelay_core::DecodeErrorPolicy;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["smsrelay", "-u", "relay", "-p", "secret"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn with_profile() -> Config {
        let mut config = Config::default();
        config.defaults.utc = true;
        config.defaults.reconnect_delay = 0.0;
        config.profiles.insert(
            "home".into(),
            Profile {
                host: Some("broker.lan".into()),
                port: Some(8883),
                topics: vec!["sms/in".into()],
                client_id: Some("relay-home".into()),
                ..Profile::default()
            },
        );
        config
    }

    #[test]
    fn built_in_defaults() {
        let settings = resolve_settings(&cli(&[]), &Config::default()).unwrap();
        let relay = settings.relay;

        assert_eq!(relay.connect.host, DEFAULT_HOST);
        assert_eq!(relay.connect.port, DEFAULT_PORT);
        assert_eq!(relay.connect.username, "relay");
        assert_eq!(relay.connect.password.expose_secret(), "secret");
        assert!(relay.connect.client_id.starts_with("smsrelay-"));
        assert_eq!(relay.connect.client_id.len(), 21);
        assert_eq!(relay.connect.keepalive, Duration::from_secs(60));
        assert_eq!(relay.topics, vec!["$SYS/#"]);
        assert_eq!(relay.qos, QoS::AtLeastOnce);
        assert_eq!(relay.pipeline, PipelineOptions::default());
        assert_eq!(relay.reconnect, ReconnectPolicy::default());
        assert_eq!(settings.log_level, LevelFilter::INFO);
        assert_eq!(settings.notify_command, None);
    }

    #[test]
    fn flags_override_profile_and_defaults() {
        let settings = resolve_settings(
            &cli(&[
                "--profile",
                "home",
                "--host",
                "10.0.0.2",
                "-t",
                "a,b",
                "--reconnect-delay",
                "2",
                "--errors",
                "strict",
                "--qos",
                "0",
            ]),
            &with_profile(),
        )
        .unwrap();
        let relay = settings.relay;

        assert_eq!(relay.connect.host, "10.0.0.2");
        assert_eq!(relay.connect.port, 8883);
        assert_eq!(relay.connect.client_id, "relay-home");
        assert_eq!(relay.topics, vec!["a", "b"]);
        assert_eq!(relay.qos, QoS::AtMostOnce);
        assert_eq!(relay.pipeline.decode.errors, DecodeErrorPolicy::Strict);
        assert!(relay.pipeline.use_utc);
        assert_eq!(relay.reconnect.delay, Duration::from_secs(2));
    }

    #[test]
    fn profile_topics_and_disabled_reconnect_from_defaults() {
        let settings = resolve_settings(&cli(&["--profile", "home"]), &with_profile()).unwrap();
        assert_eq!(settings.relay.topics, vec!["sms/in"]);
        assert!(!settings.relay.reconnect.enabled);
    }

    #[test]
    fn explicitly_empty_credentials_are_kept() {
        let cli = Cli::try_parse_from(["smsrelay", "-u", "", "-p", ""]).unwrap();
        let settings = resolve_settings(&cli, &Config::default()).unwrap();
        assert_eq!(settings.relay.connect.username, "");
        assert_eq!(settings.relay.connect.password.expose_secret(), "");
    }

    #[test]
    fn flag_password_wins_over_profile_even_when_empty() {
        let mut config = with_profile();
        if let Some(home) = config.profiles.get_mut("home") {
            home.password = Some("from-profile".into());
        }
        let cli = Cli::try_parse_from(["smsrelay", "-u", "relay", "-p", "", "--profile", "home"])
            .unwrap();
        let settings = resolve_settings(&cli, &config).unwrap();
        assert_eq!(settings.relay.connect.password.expose_secret(), "");
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = resolve_settings(&cli(&["--encoding", "ebcdic"]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn invalid_client_id_is_rejected() {
        let err =
            resolve_settings(&cli(&["--client-id", " padded"]), &Config::default()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let err = resolve_settings(&cli(&["--profile", "lab"]), &with_profile()).unwrap_err();
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
    }

    #[test]
    fn log_level_names_and_numbers() {
        assert_eq!(parse_log_level("warning").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_log_level("CRITICAL").unwrap(), LevelFilter::ERROR);
        assert_eq!(parse_log_level("Debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_log_level("5").unwrap(), LevelFilter::TRACE);
        assert_eq!(parse_log_level("10").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_log_level("20").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_log_level("25").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_log_level("50").unwrap(), LevelFilter::ERROR);
        assert!(parse_log_level("loud").is_err());
        assert!(parse_log_level("").is_err());
    }
}
