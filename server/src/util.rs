use chrono::{DateTime, Duration, Utc};

use crate::email::message::truncate_chars;

const EXPIRY_MARGIN_SECS: i64 = 30;
const PREVIEW_CHARS: usize = 200;

pub fn check_expired(expires_at: DateTime<Utc>) -> bool {
    let now_with_margin = Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS);
    now_with_margin > expires_at
}

/// First characters of a body, as stored alongside a summary.
pub fn body_preview(body: &str) -> String {
    truncate_chars(body, PREVIEW_CHARS).to_string()
}
