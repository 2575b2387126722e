use thiserror::Error;

/// Top-level error type for the `smsrelay-api` crate.
///
/// Every variant is a transport fault: something went wrong between this
/// process and the broker. `smsrelay-core` decides whether a fault is
/// retried or fatal based on the reconnect policy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connect ─────────────────────────────────────────────────────
    /// TCP connect, CONNECT/CONNACK handshake, or credentials rejected.
    #[error("Connection to {host}:{port} failed: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    // ── Subscribe ───────────────────────────────────────────────────
    /// The SUBSCRIBE request could not be queued or sent.
    #[error("Subscription to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    /// The broker answered the SUBSCRIBE with a failure return code.
    #[error("Subscription to '{topic}' rejected by broker")]
    SubscribeRejected { topic: String },

    // ── Stream ──────────────────────────────────────────────────────
    /// The live connection dropped while waiting for messages.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The broker or the session closed the connection.
    #[error("Connection closed by {0}")]
    Closed(&'static str),

    // ── Options ─────────────────────────────────────────────────────
    /// Client identifiers must be non-empty and must not start with a space.
    #[error("Invalid client id '{0}'")]
    InvalidClientId(String),
}

impl Error {
    /// Lifecycle stage the fault occurred in, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Connect { .. } | Self::InvalidClientId(_) => "connect",
            Self::Subscribe { .. } | Self::SubscribeRejected { .. } => "subscribe",
            Self::ConnectionLost(_) | Self::Closed(_) => "stream",
        }
    }

    /// Returns `true` if reconnecting could plausibly resolve the fault.
    ///
    /// Invalid options are rejected on every attempt, so retrying them only
    /// spins the reconnect loop.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidClientId(_))
    }
}
