// smsrelay-api: transport seam and MQTT session plumbing for smsrelay.

pub mod error;
pub mod message;
pub mod mqtt;
pub mod transport;

pub use error::Error;
pub use message::{InboundMessage, InvalidQoS, QoS};
pub use mqtt::{MqttSession, MqttTransport};
pub use transport::{ConnectOptions, Session, Transport};
