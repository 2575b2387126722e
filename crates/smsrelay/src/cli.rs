//! Clap derive structure for the `smsrelay` binary.
//!
//! Options that also exist in the config file are `Option`s without clap
//! defaults, so an absent flag falls through to the profile and `[defaults]`.
//! The documented defaults are applied in `config::resolve_settings`.

use std::path::PathBuf;

use clap::Parser;
use smsrelay_core::DecodeErrorPolicy;

/// smsrelay -- MQTT verification code relay
#[derive(Debug, Parser)]
#[command(
    name = "smsrelay",
    version,
    about = "Relay SMS verification codes from an MQTT broker to desktop notifications",
    long_about = "Subscribes to MQTT topics, prints every message, extracts 4-8 digit \
        verification codes from SMS gateway payloads and hands a notification \
        with a copy-to-clipboard action to an external notifier.",
    after_help = "Credentials can be preset with the MQTT_USERNAME and MQTT_PASSWORD \
        environment variables."
)]
pub struct Cli {
    // ── Connection ───────────────────────────────────────────────────
    /// Broker host name or IP [default: 127.0.0.1]
    #[arg(long, help_heading = "Connection")]
    pub host: Option<String>,

    /// Broker port [default: 1883]
    #[arg(long, help_heading = "Connection")]
    pub port: Option<u16>,

    /// Username for broker authentication
    #[arg(short = 'u', long, env = "MQTT_USERNAME", help_heading = "Connection")]
    pub username: Option<String>,

    /// Password for broker authentication
    #[arg(
        short = 'p',
        long,
        env = "MQTT_PASSWORD",
        hide_env_values = true,
        help_heading = "Connection"
    )]
    pub password: Option<String>,

    /// Client identifier [default: random smsrelay-<id>]
    #[arg(long, help_heading = "Connection")]
    pub client_id: Option<String>,

    /// Keepalive interval in seconds [default: 60]
    #[arg(long, help_heading = "Connection")]
    pub keepalive: Option<u64>,

    // ── Subscription ─────────────────────────────────────────────────
    /// Topic to subscribe to; repeatable or comma separated [default: $SYS/#]
    #[arg(
        short = 't',
        long = "topic",
        alias = "topics",
        value_name = "TOPIC",
        help_heading = "Subscription"
    )]
    pub topics: Vec<String>,

    /// Subscription QoS [default: 1]
    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(0..=2),
        help_heading = "Subscription"
    )]
    pub qos: Option<u8>,

    // ── Payload ──────────────────────────────────────────────────────
    /// Payload text encoding: utf-8, ascii, latin-1, utf-16le, utf-16be [default: utf-8]
    #[arg(long, help_heading = "Payload")]
    pub encoding: Option<String>,

    /// Invalid byte handling: strict, ignore, replace, backslashreplace [default: replace]
    #[arg(long, value_name = "POLICY", help_heading = "Payload")]
    pub errors: Option<DecodeErrorPolicy>,

    /// Show payloads as hex without decoding
    #[arg(long, help_heading = "Payload")]
    pub raw_payload: bool,

    // ── Runtime ──────────────────────────────────────────────────────
    /// Timestamp output in UTC instead of local time
    #[arg(long, help_heading = "Runtime")]
    pub utc: bool,

    /// Seconds to wait before reconnecting after a fault; <= 0 disables [default: 5.0]
    #[arg(
        long,
        value_name = "SECONDS",
        allow_negative_numbers = true,
        help_heading = "Runtime"
    )]
    pub reconnect_delay: Option<f64>,

    /// Log level name (TRACE..CRITICAL) or number [default: INFO]
    #[arg(long, value_name = "LEVEL", help_heading = "Runtime")]
    pub log_level: Option<String>,

    /// Notifier command; receives title and body as arguments
    #[arg(
        long,
        value_name = "COMMAND",
        env = "SMSRELAY_NOTIFY_COMMAND",
        help_heading = "Runtime"
    )]
    pub notify_command: Option<String>,

    // ── Configuration ────────────────────────────────────────────────
    /// Broker profile from the config file
    #[arg(long, env = "SMSRELAY_PROFILE", help_heading = "Configuration")]
    pub profile: Option<String>,

    /// Config file path [default: platform config dir]
    #[arg(long, env = "SMSRELAY_CONFIG", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn topics_accept_all_spellings() {
        let cli =
            Cli::try_parse_from(["smsrelay", "-t", "a", "--topic", "b,c", "--topics", "d"]).unwrap();
        assert_eq!(cli.topics, vec!["a", "b,c", "d"]);
    }

    #[test]
    fn qos_is_range_checked() {
        assert_eq!(
            Cli::try_parse_from(["smsrelay", "--qos", "2"]).unwrap().qos,
            Some(2)
        );
        assert!(Cli::try_parse_from(["smsrelay", "--qos", "3"]).is_err());
    }

    #[test]
    fn negative_reconnect_delay_is_accepted() {
        let cli = Cli::try_parse_from(["smsrelay", "--reconnect-delay", "-1"]).unwrap();
        assert_eq!(cli.reconnect_delay, Some(-1.0));
    }

    #[test]
    fn error_policy_is_case_insensitive() {
        let cli = Cli::try_parse_from(["smsrelay", "--errors", "BackslashReplace"]).unwrap();
        assert_eq!(cli.errors, Some(DecodeErrorPolicy::BackslashReplace));
    }
}
