use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FALLBACK_SUMMARY: &str = "Error generating summary. Please try again.";
pub const MISSING_SUMMARY: &str = "Unable to generate summary";
const UNKNOWN: &str = "unknown";
const NEUTRAL: &str = "neutral";

lazy_static::lazy_static!(
    static ref RE_FENCE: Regex = Regex::new(r"```(?:json)?\s*").unwrap();
);

/// Structured summary of one email, always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    pub key_points: Vec<String>,
    pub action_items: Vec<String>,
    pub urgency: String,
    pub category: String,
    pub sentiment: String,
}

impl Analysis {
    /// Returned whenever the model gave nothing usable.
    pub fn unavailable() -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_string(),
            key_points: vec![],
            action_items: vec![],
            urgency: UNKNOWN.to_string(),
            category: UNKNOWN.to_string(),
            sentiment: NEUTRAL.to_string(),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            summary: string_field(obj, "summary", MISSING_SUMMARY),
            key_points: list_field(obj, "key_points"),
            action_items: list_field(obj, "action_items"),
            urgency: string_field(obj, "urgency", UNKNOWN),
            category: string_field(obj, "category", UNKNOWN),
            sentiment: string_field(obj, "sentiment", NEUTRAL),
        }
    }
}

fn string_field(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn list_field(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(items) = obj.get(key).and_then(Value::as_array) else {
        return vec![];
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect()
}

/// Pulls the JSON object out of free-form model output.
fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Turns model output into an [`Analysis`]. Never fails.
pub fn normalize(raw: Option<&str>) -> Analysis {
    let Some(raw) = raw else {
        return Analysis::unavailable();
    };

    let unfenced = RE_FENCE.replace_all(raw, "");
    let Some(json) = extract_object(&unfenced) else {
        tracing::warn!("No JSON found in model response");
        return Analysis::unavailable();
    };

    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(obj)) => Analysis::from_object(&obj),
        Ok(_) => Analysis::unavailable(),
        Err(e) => {
            tracing::warn!("Could not parse model response as JSON: {}", e);
            Analysis::unavailable()
        }
    }
}
