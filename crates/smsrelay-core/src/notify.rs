// ── Notification sinks ──
//
// A sink is an owned resource handed to the pipeline at startup. Delivery is
// fire-and-forget: the pipeline logs a failed delivery and moves on.

use std::process::Stdio;

use thiserror::Error;

/// What the presentation layer should show for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub actions: Vec<NotificationAction>,
}

impl NotificationRequest {
    /// Text for the clipboard action, if the notification offers one.
    pub fn copy_text(&self) -> Option<&str> {
        self.actions
            .iter()
            .map(|action| match action {
                NotificationAction::CopyToClipboard { text } => text.as_str(),
            })
            .next()
    }
}

/// Interactive action attached to a notification. Carries its own payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    CopyToClipboard { text: String },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification sink is disabled after an earlier failure")]
    Disabled,

    #[error("failed to launch notifier '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait NotificationSink {
    fn deliver(&mut self, request: &NotificationRequest) -> Result<(), SinkError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn deliver(&mut self, request: &NotificationRequest) -> Result<(), SinkError> {
        (**self).deliver(request)
    }
}

// ── LogSink ─────────────────────────────────────────────────────────

/// Emits notifications as tracing events. Used when no notifier is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&mut self, request: &NotificationRequest) -> Result<(), SinkError> {
        tracing::info!(
            title = %request.title,
            body = %request.body,
            copy = request.copy_text().unwrap_or(""),
            "Notification"
        );
        Ok(())
    }
}

// ── CommandSink ─────────────────────────────────────────────────────

/// Environment variable carrying the clipboard payload to the notifier.
pub const COPY_TEXT_ENV: &str = "SMSRELAY_COPY_TEXT";

/// Hands notifications to an external program, e.g. `notify-send`.
///
/// The program is spawned with its configured arguments followed by the
/// title and body. It is not waited on. After the first launch failure the
/// sink disables itself so a missing notifier is reported once, not per
/// message.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    disabled: bool,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            disabled: false,
        }
    }

    /// Split a whitespace-separated command line. `None` if it is blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn command(&self, request: &NotificationRequest) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&request.title)
            .arg(&request.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(text) = request.copy_text() {
            cmd.env(COPY_TEXT_ENV, text);
        }
        cmd
    }
}

impl NotificationSink for CommandSink {
    fn deliver(&mut self, request: &NotificationRequest) -> Result<(), SinkError> {
        if self.disabled {
            return Err(SinkError::Disabled);
        }

        match self.command(request).spawn() {
            // Dropped without waiting; tokio reaps the child in the background.
            Ok(_child) => Ok(()),
            Err(source) => {
                self.disabled = true;
                Err(SinkError::Spawn {
                    program: self.program.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn request(code: Option<&str>) -> NotificationRequest {
        NotificationRequest {
            title: "552013".into(),
            body: "验证码为：552013".into(),
            actions: code
                .map(|text| NotificationAction::CopyToClipboard { text: text.into() })
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn copy_text_comes_from_the_action() {
        assert_eq!(request(Some("552013")).copy_text(), Some("552013"));
        assert_eq!(request(None).copy_text(), None);
    }

    #[test]
    fn command_line_parsing() {
        let sink = CommandSink::from_command_line("notify-send -a smsrelay").unwrap();
        assert_eq!(sink.program(), "notify-send");
        assert_eq!(sink.args, vec!["-a".to_string(), "smsrelay".to_string()]);
        assert!(CommandSink::from_command_line("   ").is_none());
    }

    #[test]
    fn log_sink_always_succeeds() {
        assert!(LogSink.deliver(&request(Some("1"))).is_ok());
    }

    #[tokio::test]
    async fn missing_program_disables_the_sink() {
        let mut sink = CommandSink::new("/nonexistent/smsrelay-notifier", Vec::new());

        let first = sink.deliver(&request(None));
        assert!(matches!(first, Err(SinkError::Spawn { .. })));
        assert!(sink.is_disabled());

        let second = sink.deliver(&request(None));
        assert!(matches!(second, Err(SinkError::Disabled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_program_is_launched() {
        let mut sink = CommandSink::new("true", Vec::new());
        assert!(sink.deliver(&request(Some("552013"))).is_ok());
        assert!(!sink.is_disabled());
    }
}
