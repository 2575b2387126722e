//! Message pipeline and connection supervision for smsrelay.
//!
//! Everything between the transport seam in `smsrelay-api` and the binary:
//!
//! - **[`decode()`]**: raw payload bytes to display text, with a hex fallback
//!   for payloads that are not text in the configured encoding.
//!
//! - **[`parse()`]**: decoded text to a display body plus the ordered
//!   snippets the extractor scans. JSON objects from an SMS gateway are
//!   flattened one field per line.
//!
//! - **[`extract()`]**: a heuristic scan for a 4–8 digit verification code.
//!
//! - **[`compose()`]**: the sanitized [`NotificationRequest`] handed to a
//!   [`NotificationSink`].
//!
//! - **[`Pipeline`]**: runs the four steps above for one message at a time.
//!
//! - **[`Supervisor`]**: owns the session lifecycle, drives each delivered
//!   message through the pipeline and reconnects on transport faults.

pub mod compose;
pub mod config;
pub mod decode;
pub mod error;
pub mod extract;
pub mod notify;
pub mod parse;
pub mod pipeline;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use compose::compose;
pub use config::{
    DEFAULT_RECONNECT_DELAY_SECS, DEFAULT_TOPIC, DecodeOptions, PipelineOptions, ReconnectPolicy,
    RelayConfig, parse_topics,
};
pub use decode::{
    DecodeError, DecodeErrorPolicy, DecodedPayload, TextEncoding, UnknownEncoding, decode,
};
pub use error::CoreError;
pub use extract::extract;
pub use notify::{
    COPY_TEXT_ENV, CommandSink, LogSink, NotificationAction, NotificationRequest,
    NotificationSink, SinkError,
};
pub use parse::{EMPTY_PLACEHOLDER, ParsedContent, parse};
pub use pipeline::{Pipeline, PipelineOutput, format_message_line};
pub use supervisor::{SessionOutcome, Supervisor, SupervisorReport, SupervisorState};
