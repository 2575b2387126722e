//! MQTT session built on [`rumqttc`].
//!
//! `rumqttc` splits a connection into an [`AsyncClient`] (request handle)
//! and an [`EventLoop`] that must be polled to make progress. A
//! [`MqttSession`] owns both and only polls from inside its own methods, so
//! the supervisor sees a plain pull-based message stream.
//!
//! Messages that arrive while a SUBSCRIBE is in flight (typically retained
//! messages for an earlier topic) are buffered and handed out first by
//! [`Session::next_message`], preserving broker order.

use std::collections::VecDeque;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, SubscribeReasonCode};
use secrecy::ExposeSecret;

use crate::error::Error;
use crate::message::{InboundMessage, QoS};
use crate::transport::{ConnectOptions, Session, Transport};

// ── Tuning ──────────────────────────────────────────────────────────

const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// rumqttc refuses keepalives below this.
const MIN_KEEPALIVE: Duration = Duration::from_secs(5);

/// How long `close()` keeps polling so the DISCONNECT packet is flushed.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

// ── QoS mapping ─────────────────────────────────────────────────────

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => Self::AtMostOnce,
            QoS::AtLeastOnce => Self::AtLeastOnce,
            QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

impl From<rumqttc::QoS> for QoS {
    fn from(qos: rumqttc::QoS) -> Self {
        match qos {
            rumqttc::QoS::AtMostOnce => Self::AtMostOnce,
            rumqttc::QoS::AtLeastOnce => Self::AtLeastOnce,
            rumqttc::QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

fn inbound_from_publish(publish: Publish) -> InboundMessage {
    InboundMessage {
        topic: publish.topic,
        payload: publish.payload,
        qos: publish.qos.into(),
        retain: publish.retain,
        properties: None,
    }
}

fn mqtt_options(options: &ConnectOptions) -> MqttOptions {
    let mut mqtt = MqttOptions::new(&options.client_id, &options.host, options.port);
    mqtt.set_keep_alive(options.keepalive.max(MIN_KEEPALIVE))
        .set_credentials(&options.username, options.password.expose_secret())
        .set_clean_session(true);
    mqtt
}

// ── MqttTransport ───────────────────────────────────────────────────

/// Production [`Transport`]: one TCP connection per connect attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct MqttTransport;

impl Transport for MqttTransport {
    type Session = MqttSession;

    async fn connect(&mut self, options: &ConnectOptions) -> Result<MqttSession, Error> {
        MqttSession::open(options).await
    }
}

// ── MqttSession ─────────────────────────────────────────────────────

pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
    pending: VecDeque<InboundMessage>,
}

impl MqttSession {
    /// Connect and wait for the broker's CONNACK.
    async fn open(options: &ConnectOptions) -> Result<Self, Error> {
        options.validate()?;

        tracing::debug!(
            endpoint = %options.endpoint(),
            client_id = %options.client_id,
            "Opening MQTT connection"
        );

        let (client, mut eventloop) =
            AsyncClient::new(mqtt_options(options), REQUEST_CHANNEL_CAPACITY);

        // rumqttc reports a refused CONNACK as a poll error, so any
        // ConnAck that comes back Ok is an accepted session.
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::debug!(session_present = ack.session_present, "CONNACK received");
                    break;
                }
                Ok(event) => tracing::trace!(?event, "Event before CONNACK"),
                Err(e) => {
                    return Err(Error::Connect {
                        host: options.host.clone(),
                        port: options.port,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            client,
            eventloop,
            pending: VecDeque::new(),
        })
    }
}

impl Session for MqttSession {
    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Error> {
        self.client
            .subscribe(topic, qos.into())
            .await
            .map_err(|e| Error::Subscribe {
                topic: topic.to_owned(),
                reason: e.to_string(),
            })?;

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        return Err(Error::SubscribeRejected {
                            topic: topic.to_owned(),
                        });
                    }
                    return Ok(());
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.pending.push_back(inbound_from_publish(publish));
                }
                Ok(event) => tracing::trace!(?event, topic, "Event before SUBACK"),
                Err(e) => {
                    return Err(Error::Subscribe {
                        topic: topic.to_owned(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn next_message(&mut self) -> Result<InboundMessage, Error> {
        if let Some(buffered) = self.pending.pop_front() {
            return Ok(buffered);
        }

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(inbound_from_publish(publish));
                }
                Ok(event) => tracing::trace!(?event, "MQTT event"),
                Err(e) => return Err(Error::ConnectionLost(e.to_string())),
            }
        }
    }

    async fn close(mut self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(error = %e, "DISCONNECT could not be queued");
            return;
        }
        let _ = tokio::time::timeout(CLOSE_GRACE, self.eventloop.poll()).await;
    }
}
