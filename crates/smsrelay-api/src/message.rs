// ── Inbound message model ──
//
// Transport-neutral shape of a delivered message. Every field is required
// and carries a defined default, so consumers never probe for attributes.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── QoS ─────────────────────────────────────────────────────────────

/// MQTT delivery guarantee.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    #[strum(serialize = "0")]
    AtMostOnce,
    #[default]
    #[strum(serialize = "1")]
    AtLeastOnce,
    #[strum(serialize = "2")]
    ExactlyOnce,
}

impl QoS {
    pub fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QoS {
    type Error = InvalidQoS;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(InvalidQoS(other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos.level()
    }
}

/// A QoS level outside `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidQoS(pub u8);

impl fmt::Display for InvalidQoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QoS must be 0, 1 or 2 (got {})", self.0)
    }
}

impl std::error::Error for InvalidQoS {}

// ── InboundMessage ──────────────────────────────────────────────────

/// One message delivered on an active session. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was published to. Empty when the broker sent none.
    pub topic: String,

    /// Raw payload bytes, undecoded.
    pub payload: Bytes,

    /// Delivery QoS the broker used for this message.
    pub qos: QoS,

    /// Whether the broker replayed this from its retained store.
    pub retain: bool,

    /// Protocol properties (MQTT v5 user properties). `None` on v3.1.1.
    pub properties: Option<BTreeMap<String, String>>,
}

impl InboundMessage {
    /// Build a message with default QoS, no retain flag and no properties.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::default(),
            retain: false,
            properties: None,
        }
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_from_level() {
        assert_eq!(QoS::try_from(0), Ok(QoS::AtMostOnce));
        assert_eq!(QoS::try_from(2), Ok(QoS::ExactlyOnce));
        assert_eq!(QoS::try_from(3), Err(InvalidQoS(3)));
    }

    #[test]
    fn qos_parses_and_displays_as_level() {
        assert_eq!("1".parse::<QoS>().ok(), Some(QoS::AtLeastOnce));
        assert_eq!(QoS::ExactlyOnce.to_string(), "2");
        assert!("high".parse::<QoS>().is_err());
    }

    #[test]
    fn message_defaults() {
        let msg = InboundMessage::new("sms/in", &b"hi"[..]);
        assert_eq!(msg.qos, QoS::AtLeastOnce);
        assert!(!msg.retain);
        assert!(msg.properties.is_none());
        assert_eq!(msg.payload.as_ref(), b"hi");
    }
}
