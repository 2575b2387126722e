// ── Core error types ──
//
// Only two things ever stop the relay: bad configuration before startup and a
// transport fault the reconnect policy will not retry. Decode faults, parse
// ambiguity and sink failures are absorbed where they happen.

use thiserror::Error;

use crate::decode::UnknownEncoding;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Transport errors ─────────────────────────────────────────────
    #[error("Transport fault during {stage}: {reason}")]
    Transport { stage: &'static str, reason: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<smsrelay_api::Error> for CoreError {
    fn from(err: smsrelay_api::Error) -> Self {
        match err {
            smsrelay_api::Error::InvalidClientId(id) => CoreError::Config {
                message: format!("invalid client id '{id}'"),
            },
            other => CoreError::Transport {
                stage: other.stage(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<UnknownEncoding> for CoreError {
    fn from(err: UnknownEncoding) -> Self {
        CoreError::Config {
            message: err.to_string(),
        }
    }
}
