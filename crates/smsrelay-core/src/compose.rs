//! Notification composition.
//!
//! Toast renderers cope badly with long or ragged text, so the body is
//! flattened to at most [`MAX_BODY_LINES`] non-blank lines and both fields
//! are capped. All lengths are in characters.

use crate::notify::{NotificationAction, NotificationRequest};
use crate::parse::EMPTY_PLACEHOLDER;

pub const MAX_BODY_LINES: usize = 6;
pub const MAX_BODY_CHARS: usize = 500;
pub const MAX_TITLE_CHARS: usize = 200;

const ELLIPSIS: &str = "…";

/// Build the notification for one message.
///
/// The title is the code when one was found, so it is readable at a glance.
pub fn compose(topic: &str, body: &str, code: Option<&str>) -> NotificationRequest {
    let title = match code {
        Some(code) => code.trim().to_owned(),
        None => default_title(topic),
    };
    let title = if title.is_empty() {
        default_title(topic)
    } else {
        title
    };

    NotificationRequest {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        body: compose_body(body),
        actions: code
            .map(|text| NotificationAction::CopyToClipboard {
                text: text.to_owned(),
            })
            .into_iter()
            .collect(),
    }
}

fn default_title(topic: &str) -> String {
    let topic = topic.trim();
    if topic.is_empty() {
        "MQTT: <unknown>".to_owned()
    } else {
        format!("MQTT: {topic}")
    }
}

fn compose_body(body: &str) -> String {
    let cleaned = body.replace('\r', "");
    let mut lines: Vec<&str> = cleaned
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return EMPTY_PLACEHOLDER.to_owned();
    }
    if lines.len() > MAX_BODY_LINES {
        lines.truncate(MAX_BODY_LINES);
        lines.push(ELLIPSIS);
    }

    truncate_chars(&lines.join("\n"), MAX_BODY_CHARS)
}

/// Cap `text` at `max` characters, marking the cut with an ellipsis.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn code_becomes_title_and_copy_action() {
        let request = compose("t", "line1\nline2", Some("1234"));
        assert_eq!(request.title, "1234");
        assert_eq!(request.body, "line1\nline2");
        assert_eq!(
            request.actions,
            vec![NotificationAction::CopyToClipboard {
                text: "1234".into()
            }]
        );
    }

    #[test]
    fn no_code_uses_topic_title_and_placeholder_body() {
        let request = compose("sensor/1", "", None);
        assert_eq!(request.title, "MQTT: sensor/1");
        assert_eq!(request.body, EMPTY_PLACEHOLDER);
        assert!(request.actions.is_empty());
    }

    #[test]
    fn empty_topic_is_unknown() {
        assert_eq!(compose("", "x", None).title, "MQTT: <unknown>");
        assert_eq!(compose("  ", "x", Some("  ")).title, "MQTT: <unknown>");
    }

    #[test]
    fn body_is_cleaned_line_by_line() {
        let request = compose("t", "  a \r\n\r\n\t b\n   \nc  ", None);
        assert_eq!(request.body, "a\nb\nc");
    }

    #[test]
    fn body_keeps_six_lines_then_marks_the_cut() {
        let body = (1..=8).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        assert_eq!(compose("t", &body, None).body, "1\n2\n3\n4\n5\n6\n…");

        let exact = (1..=6).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        assert_eq!(compose("t", &exact, None).body, exact);
    }

    #[test]
    fn long_body_is_capped_in_characters() {
        let body = "验".repeat(600);
        let composed = compose("t", &body, None).body;
        assert_eq!(composed.chars().count(), 498);
        assert!(composed.ends_with('…'));
        assert!(composed.starts_with("验验验"));

        let fits = "x".repeat(MAX_BODY_CHARS);
        assert_eq!(compose("t", &fits, None).body, fits);
    }

    #[test]
    fn long_title_is_capped() {
        let topic = "a".repeat(300);
        let title = compose(&topic, "b", None).title;
        assert_eq!(title.chars().count(), 198);
        assert!(title.starts_with("MQTT: aaa"));
        assert!(title.ends_with('…'));
    }
}
