//! Structured message parsing.
//!
//! Payloads are usually JSON objects forwarded by an SMS gateway
//! (`{"msg": "...", "phone": "..."}`), but anything else must still produce
//! something to show. The parser never fails: non-JSON input becomes a plain
//! body, and the final body is always the last snippet so extraction always
//! has at least one scan target.

use serde_json::{Map, Value};

/// Body shown for empty or whitespace-only payloads.
pub const EMPTY_PLACEHOLDER: &str = "<empty message>";

/// Object field holding the human-readable message line.
pub const MESSAGE_FIELD: &str = "msg";

/// Display body plus the ordered strings the extractor scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub body: String,
    pub snippets: Vec<String>,
}

/// Parse decoded payload text into a body and scan snippets.
pub fn parse(text: &str) -> ParsedContent {
    let raw = text.trim();
    if raw.is_empty() {
        return ParsedContent {
            body: EMPTY_PLACEHOLDER.to_owned(),
            snippets: vec![EMPTY_PLACEHOLDER.to_owned()],
        };
    }

    let mut snippets = Vec::new();
    let body = match serde_json::from_str::<Value>(raw) {
        Err(_) => {
            snippets.push(raw.to_owned());
            raw.to_owned()
        }
        Ok(Value::Object(fields)) => object_body(&fields, raw, &mut snippets),
        Ok(array @ Value::Array(_)) => {
            let pretty = serde_json::to_string_pretty(&array).unwrap_or_else(|_| raw.to_owned());
            snippets.push(pretty.clone());
            pretty
        }
        Ok(scalar) => {
            let rendered = scalar.to_string();
            snippets.push(rendered.clone());
            rendered
        }
    };

    snippets.push(body.clone());
    ParsedContent { body, snippets }
}

/// One line per non-null field, with the message field first.
fn object_body(fields: &Map<String, Value>, raw: &str, snippets: &mut Vec<String>) -> String {
    let mut lines = Vec::new();

    if let Some(Value::String(message)) = fields.get(MESSAGE_FIELD) {
        let message = message.trim();
        if !message.is_empty() {
            lines.push(message.to_owned());
            snippets.push(message.to_owned());
        }
    }

    for (key, value) in fields {
        if key == MESSAGE_FIELD {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Object(_) | Value::Array(_) => {
                let compact = value.to_string();
                lines.push(format!("{key}: {compact}"));
                snippets.push(compact);
            }
            Value::String(text) => {
                lines.push(format!("{key}: {text}"));
                snippets.push(text.clone());
            }
            Value::Bool(_) | Value::Number(_) => lines.push(format!("{key}: {value}")),
        }
    }

    if snippets.is_empty() {
        snippets.push(raw.to_owned());
    }

    if lines.is_empty() {
        raw.to_owned()
    } else {
        lines.join("\n")
    }
}
