// ── Transport seam ──
//
// The supervisor in `smsrelay-core` only talks to these traits. The MQTT
// implementation lives in `crate::mqtt`; tests plug in scripted fakes.

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::Error;
use crate::message::{InboundMessage, QoS};

/// Everything needed to open one session against the broker.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub client_id: String,
    pub keepalive: Duration,
}

impl ConnectOptions {
    /// `host:port`, for logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject identifiers the broker (or the MQTT client) would refuse.
    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.is_empty() || self.client_id.starts_with(' ') {
            return Err(Error::InvalidClientId(self.client_id.clone()));
        }
        Ok(())
    }
}

/// Opens sessions. One call per connect attempt.
pub trait Transport {
    type Session: Session;

    fn connect(
        &mut self,
        options: &ConnectOptions,
    ) -> impl Future<Output = Result<Self::Session, Error>> + Send;
}

/// A live connection. Dropped (or closed) when the supervisor leaves it.
pub trait Session: Send {
    fn subscribe(&mut self, topic: &str, qos: QoS)
    -> impl Future<Output = Result<(), Error>> + Send;

    /// Wait for the next delivered message, in broker order.
    ///
    /// Any error ends the session; the caller never polls again afterwards.
    fn next_message(&mut self) -> impl Future<Output = Result<InboundMessage, Error>> + Send;

    /// Best-effort graceful disconnect.
    fn close(self) -> impl Future<Output = ()> + Send;
}
