// ── Runtime configuration ──
//
// Fully resolved settings the supervisor and pipeline run with. Built by the
// binary from CLI flags and the config file; nothing here reads the
// environment or touches disk.

use std::time::Duration;

use smsrelay_api::{ConnectOptions, QoS};

use crate::decode::{DecodeErrorPolicy, TextEncoding};

/// Delay used when none is configured, in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: f64 = 5.0;

/// Topic subscribed to when none is configured.
pub const DEFAULT_TOPIC: &str = "$SYS/#";

/// Whether and how long to wait before reconnecting after a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub enabled: bool,
}

impl ReconnectPolicy {
    /// Build from a delay in seconds. Zero, negative and non-finite values
    /// disable reconnecting; the first fault is then fatal.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self {
                delay: Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX),
                enabled: true,
            }
        } else {
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self {
            delay: Duration::ZERO,
            enabled: false,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_secs_f64(DEFAULT_RECONNECT_DELAY_SECS)
    }
}

/// How payload bytes become display text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub encoding: TextEncoding,
    pub errors: DecodeErrorPolicy,
    /// Show every payload as hex without attempting to decode it.
    pub raw_payload: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub decode: DecodeOptions,
    /// Timestamp log lines in UTC instead of local time.
    pub use_utc: bool,
}

/// Everything one supervisor run needs.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub connect: ConnectOptions,
    pub topics: Vec<String>,
    pub qos: QoS,
    pub pipeline: PipelineOptions,
    pub reconnect: ReconnectPolicy,
}

/// Split repeated and comma-separated topic arguments into a unique list,
/// preserving first-seen order. Falls back to [`DEFAULT_TOPIC`].
pub fn parse_topics<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for entry in raw {
        for topic in entry.as_ref().split(',').map(str::trim) {
            if !topic.is_empty() && !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_owned());
            }
        }
    }
    if topics.is_empty() {
        topics.push(DEFAULT_TOPIC.to_owned());
    }
    topics
}
