//! Per-message processing: decode, parse, extract, compose, deliver.
//!
//! One [`Pipeline::process`] call handles one message start to finish. The
//! pass is synchronous and cannot fail; every fault along the way is logged
//! and absorbed so the next message is handled normally.

use std::fmt::Write as _;
use std::io::Write;

use chrono::{Local, SecondsFormat, Utc};
use smsrelay_api::InboundMessage;
use tracing::{debug, info, info_span, warn};

use crate::compose::compose;
use crate::config::PipelineOptions;
use crate::decode::{DecodedPayload, decode};
use crate::extract::extract;
use crate::notify::{NotificationRequest, NotificationSink, SinkError};
use crate::parse::{ParsedContent, parse};

/// Everything one pass produced, mostly for tests and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub decoded: DecodedPayload,
    pub parsed: ParsedContent,
    pub code: Option<String>,
    pub notification: NotificationRequest,
}

pub struct Pipeline<S, W> {
    options: PipelineOptions,
    sink: S,
    writer: W,
}

impl<S: NotificationSink, W: Write> Pipeline<S, W> {
    pub fn new(options: PipelineOptions, sink: S, writer: W) -> Self {
        Self {
            options,
            sink,
            writer,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_parts(self) -> (S, W) {
        (self.sink, self.writer)
    }

    pub fn process(&mut self, message: &InboundMessage) -> PipelineOutput {
        let span = info_span!("message", topic = %message.topic);
        let _guard = span.enter();

        let opts = self.options.decode;
        let decoded = decode(&message.payload, opts.encoding, opts.errors, opts.raw_payload);

        let line = format_message_line(message, &decoded.text, &self.timestamp());
        if let Err(e) = writeln!(self.writer, "{line}").and_then(|()| self.writer.flush()) {
            warn!(error = %e, "Failed to write message line");
        }

        let parsed = parse(&decoded.text);
        let code = extract(&parsed.snippets);
        let notification = compose(&message.topic, &parsed.body, code.as_deref());

        info!(
            qos = %message.qos,
            retain = message.retain,
            bytes = message.payload.len(),
            hex = decoded.hex_fallback,
            code = code.as_deref().unwrap_or(""),
            "Message received"
        );

        match self.sink.deliver(&notification) {
            Ok(()) => {}
            Err(SinkError::Disabled) => debug!("Notification sink disabled, skipping delivery"),
            Err(e) => warn!(error = %e, stage = "notify", "Notification delivery failed"),
        }

        PipelineOutput {
            decoded,
            parsed,
            code,
            notification,
        }
    }

    fn timestamp(&self) -> String {
        if self.options.use_utc {
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
        } else {
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
        }
    }
}

/// Two-line console rendering of a message.
///
/// ```text
/// [2024-05-01T08:30:00+00:00] topic=sms/in qos=1 retain=false
///   payload: {"msg": "..."}
/// ```
pub fn format_message_line(message: &InboundMessage, payload: &str, timestamp: &str) -> String {
    let mut line = format!(
        "[{timestamp}] topic={} qos={} retain={}",
        message.topic, message.qos, message.retain
    );
    if let Some(props) = message.properties.as_ref().filter(|p| !p.is_empty()) {
        let rendered: Vec<String> = props.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let _ = write!(line, " props={{{}}}", rendered.join(", "));
    }
    let _ = write!(line, "\n  payload: {payload}");
    line
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::BTreeMap;

    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use smsrelay_api::QoS;

    use super::*;
    use crate::config::DecodeOptions;
    use crate::decode::{DecodeErrorPolicy, TextEncoding};
    use crate::notify::NotificationAction;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Vec<NotificationRequest>,
        fail: bool,
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&mut self, request: &NotificationRequest) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Disabled);
            }
            self.delivered.push(request.clone());
            Ok(())
        }
    }

    fn pipeline(options: PipelineOptions) -> Pipeline<RecordingSink, Vec<u8>> {
        Pipeline::new(options, RecordingSink::default(), Vec::new())
    }

    fn utc() -> PipelineOptions {
        PipelineOptions {
            use_utc: true,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn sms_gateway_message_end_to_end() {
        let mut pipeline = pipeline(utc());
        let message = InboundMessage::new(
            "sms/in",
            Bytes::from(r#"{"msg": "验证码为：552013", "phone": "+1234567890"}"#),
        );

        let out = pipeline.process(&message);

        assert!(!out.decoded.hex_fallback);
        assert!(out.parsed.body.contains("验证码为：552013"));
        assert!(out.parsed.body.contains("phone: +1234567890"));
        assert_eq!(out.code.as_deref(), Some("552013"));
        assert_eq!(out.notification.title, "552013");
        assert_eq!(
            out.notification.actions,
            vec![NotificationAction::CopyToClipboard {
                text: "552013".into()
            }]
        );
        assert_eq!(pipeline.sink().delivered, vec![out.notification]);
    }

    #[test]
    fn console_line_shows_decoded_payload() {
        let mut pipeline = pipeline(utc());
        let message = InboundMessage::new("sensors/t", Bytes::from_static(b"21.5"))
            .with_qos(QoS::ExactlyOnce)
            .with_retain(true);

        pipeline.process(&message);

        let written = String::from_utf8(pipeline.writer().clone()).unwrap();
        assert!(written.starts_with('['));
        assert!(written.contains("+00:00] topic=sensors/t qos=2 retain=true\n"));
        assert!(written.ends_with("  payload: 21.5\n"));
    }

    #[test]
    fn raw_mode_shows_hex_and_scans_it() {
        let mut pipeline = pipeline(PipelineOptions {
            decode: DecodeOptions {
                raw_payload: true,
                ..DecodeOptions::default()
            },
            use_utc: true,
        });
        let out = pipeline.process(&InboundMessage::new("bin", Bytes::from_static(b"\x01\xff")));

        assert!(out.decoded.hex_fallback);
        assert_eq!(out.decoded.text, "01ff");
        assert_eq!(out.notification.title, "MQTT: bin");
    }

    #[test]
    fn strict_decode_failure_is_not_fatal() {
        let mut pipeline = pipeline(PipelineOptions {
            decode: DecodeOptions {
                encoding: TextEncoding::Utf8,
                errors: DecodeErrorPolicy::Strict,
                raw_payload: false,
            },
            use_utc: false,
        });
        let out = pipeline.process(&InboundMessage::new("bad", Bytes::from_static(b"\xc3\x28")));
        assert_eq!(out.decoded.text, "c328");
        assert_eq!(pipeline.sink().delivered.len(), 1);
    }

    #[test]
    fn empty_payload_gets_placeholder_notification() {
        let mut pipeline = pipeline(utc());
        let out = pipeline.process(&InboundMessage::new("sensor/1", Bytes::new()));
        assert_eq!(out.decoded.text, "");
        assert_eq!(out.notification.title, "MQTT: sensor/1");
        assert_eq!(out.notification.body, "<empty message>");
        assert_eq!(out.code, None);
    }

    #[test]
    fn sink_failure_is_absorbed() {
        let mut pipeline = Pipeline::new(
            utc(),
            RecordingSink {
                fail: true,
                ..RecordingSink::default()
            },
            Vec::new(),
        );
        let out = pipeline.process(&InboundMessage::new("t", Bytes::from_static(b"code 4242")));
        assert_eq!(out.code.as_deref(), Some("4242"));
    }

    #[test]
    fn properties_are_rendered_when_present() {
        let mut props = BTreeMap::new();
        props.insert("content-type".to_string(), "json".to_string());
        let mut message = InboundMessage::new("t", Bytes::from_static(b"x"));
        message.properties = Some(props);

        let line = format_message_line(&message, "x", "TS");
        assert_eq!(
            line,
            "[TS] topic=t qos=1 retain=false props={content-type=json}\n  payload: x"
        );

        message.properties = Some(BTreeMap::new());
        assert_eq!(
            format_message_line(&message, "x", "TS"),
            "[TS] topic=t qos=1 retain=false\n  payload: x"
        );
    }
}
