//! Connection supervisor: connect → subscribe → stream → on fault, wait →
//! reconnect.
//!
//! The supervisor owns the transport and at most one live session. Every
//! session ends in a [`SessionOutcome`]; the outer loop applies the
//! [`ReconnectPolicy`](crate::config::ReconnectPolicy) to it. All suspension
//! points race the [`CancellationToken`], so cancellation is observed whether
//! the loop is connecting, subscribing, streaming or waiting to reconnect.
//!
//! ```ignore
//! let cancel = CancellationToken::new();
//! let mut supervisor = Supervisor::new(MqttTransport, &config, cancel.clone());
//! let report = supervisor.run(&mut pipeline).await?;
//! ```

use std::io::Write;

use smsrelay_api::{Error as TransportError, Session, Transport};
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::CoreError;
use crate::notify::NotificationSink;
use crate::pipeline::Pipeline;

// ── State ───────────────────────────────────────────────────────────

/// Lifecycle state, observable through [`Supervisor::state`].
///
/// `Faulted` and `Cancelled` are left in place when the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    Subscribed,
    Streaming,
    Faulted,
    Cancelled,
}

/// How one session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Cancelled,
    Faulted(TransportError),
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Sessions that completed the connect handshake.
    pub sessions: u32,
    /// Reconnect delays that were waited out in full.
    pub reconnects: u32,
    /// Messages driven through the pipeline.
    pub messages: u64,
}

// ── Supervisor ──────────────────────────────────────────────────────

pub struct Supervisor<T> {
    transport: T,
    config: RelayConfig,
    cancel: CancellationToken,
    state: watch::Sender<SupervisorState>,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(transport: T, config: &RelayConfig, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(SupervisorState::Disconnected);
        Self {
            transport,
            config: config.clone(),
            cancel,
            state,
        }
    }

    /// Subscribe to state transitions.
    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Run until cancelled (`Ok`) or until a fault the policy will not retry
    /// (`Err`).
    pub async fn run<S, W>(
        &mut self,
        pipeline: &mut Pipeline<S, W>,
    ) -> Result<SupervisorReport, CoreError>
    where
        S: NotificationSink,
        W: Write,
    {
        let mut report = SupervisorReport::default();
        let policy = self.config.reconnect;

        loop {
            if self.cancel.is_cancelled() {
                self.set_state(SupervisorState::Cancelled);
                return Ok(report);
            }

            self.set_state(SupervisorState::Connecting);
            let err = match self.run_session(pipeline, &mut report).await {
                SessionOutcome::Cancelled => {
                    info!("Subscriber cancelled, shutting down");
                    self.set_state(SupervisorState::Cancelled);
                    return Ok(report);
                }
                SessionOutcome::Faulted(err) => err,
            };

            self.set_state(SupervisorState::Faulted);
            warn!(error = %err, stage = err.stage(), "MQTT connection fault");

            if !policy.enabled {
                return Err(err.into());
            }
            if !err.is_transient() {
                warn!(stage = err.stage(), "Fault cannot be fixed by reconnecting, giving up");
                return Err(err.into());
            }

            let attempt = report.reconnects + 1;
            info!(
                delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "Waiting before reconnect"
            );
            self.set_state(SupervisorState::Disconnected);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    info!("Subscriber cancelled while waiting to reconnect");
                    self.set_state(SupervisorState::Cancelled);
                    return Ok(report);
                }
                () = tokio::time::sleep(policy.delay) => {}
            }
            report.reconnects = attempt;
        }
    }

    /// One connection lifecycle, from connect until it faults or is cancelled.
    async fn run_session<S, W>(
        &mut self,
        pipeline: &mut Pipeline<S, W>,
        report: &mut SupervisorReport,
    ) -> SessionOutcome
    where
        S: NotificationSink,
        W: Write,
    {
        let options = &self.config.connect;
        debug!(
            endpoint = %options.endpoint(),
            client_id = %options.client_id,
            "Connecting to MQTT broker"
        );

        let connected = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.transport.connect(options) => Some(result),
        };
        let mut session = match connected {
            None => return SessionOutcome::Cancelled,
            Some(Err(e)) => return SessionOutcome::Faulted(e),
            Some(Ok(session)) => session,
        };
        report.sessions += 1;
        info!(
            endpoint = %options.endpoint(),
            topics = %self.config.topics.join(", "),
            "Connected, subscribing"
        );

        let qos = self.config.qos;
        for topic in &self.config.topics {
            let subscribed = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = session.subscribe(topic, qos) => Some(result),
            };
            match subscribed {
                None => {
                    session.close().await;
                    return SessionOutcome::Cancelled;
                }
                Some(Err(e)) => {
                    session.close().await;
                    return SessionOutcome::Faulted(e);
                }
                Some(Ok(())) => info!(topic = %topic, qos = %qos, "Subscribed"),
            }
        }
        self.set_state(SupervisorState::Subscribed);

        self.set_state(SupervisorState::Streaming);
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = session.next_message() => Some(result),
            };
            match next {
                None => {
                    session.close().await;
                    return SessionOutcome::Cancelled;
                }
                Some(Err(e)) => return SessionOutcome::Faulted(e),
                Some(Ok(message)) => {
                    pipeline.process(&message);
                    report.messages += 1;
                }
            }
        }
    }

    fn set_state(&self, next: SupervisorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Supervisor state change");
        }
    }
}
