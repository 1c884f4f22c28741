use anyhow::Context;
use mail_parser::{Message, MessageParser};
use regex::Regex;

use super::EmailRecord;

const NO_SUBJECT: &str = "No Subject";
const UNKNOWN: &str = "Unknown";

lazy_static::lazy_static!(
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
);

impl EmailRecord {
    /// Builds a record from raw RFC 822 bytes as returned by `format=raw`.
    pub fn from_raw(id: &str, raw: &[u8], body_max_chars: usize) -> anyhow::Result<Self> {
        let msg = MessageParser::default()
            .parse(raw)
            .context(format!("Could not parse raw message {id}"))?;

        Ok(Self::from_message(id, &msg, body_max_chars))
    }

    fn from_message(id: &str, msg: &Message, body_max_chars: usize) -> Self {
        let subject = msg
            .subject()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUBJECT.to_string());

        let sender = msg
            .from()
            .and_then(|from| from.first())
            .and_then(|addr| match (addr.name(), addr.address()) {
                (Some(name), Some(address)) => Some(format!("{name} <{address}>")),
                (None, Some(address)) => Some(address.to_string()),
                (Some(name), None) => Some(name.to_string()),
                (None, None) => None,
            })
            .unwrap_or_else(|| UNKNOWN.to_string());

        let date = msg
            .date()
            .map(|d| d.to_rfc822())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let body = msg
            .body_text(0)
            .map(|b| collapse_whitespace(&b))
            .unwrap_or_default();

        EmailRecord {
            id: id.to_string(),
            sender,
            subject,
            date,
            body: truncate_chars(&body, body_max_chars).to_string(),
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").to_string()
}

/// Cuts `text` to at most `max_chars` characters without splitting one.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
