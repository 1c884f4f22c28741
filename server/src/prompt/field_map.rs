use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::analysis::Analysis;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_model(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum Category {
    Work,
    Personal,
    Promotion,
    Other,
}

impl Category {
    pub fn from_model(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "work" => Self::Work,
            "personal" => Self::Personal,
            "newsletter" | "promotional" => Self::Promotion,
            _ => Self::Other,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum Tone {
    Formal,
    Neutral,
    Informal,
}

impl Tone {
    pub fn from_sentiment(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "positive" => Self::Informal,
            "negative" => Self::Formal,
            _ => Self::Neutral,
        }
    }
}

/// An [`Analysis`] with its open vocabulary folded into the fixed labels the
/// client displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedAnalysis {
    pub summary: String,
    pub urgency: Urgency,
    pub tone: Tone,
    pub category: Category,
    pub key_points: Vec<String>,
    pub action_items: Vec<String>,
}

impl From<&Analysis> for MappedAnalysis {
    fn from(analysis: &Analysis) -> Self {
        Self {
            summary: analysis.summary.clone(),
            urgency: Urgency::from_model(&analysis.urgency),
            tone: Tone::from_sentiment(&analysis.sentiment),
            category: Category::from_model(&analysis.category),
            key_points: analysis.key_points.clone(),
            action_items: analysis.action_items.clone(),
        }
    }
}
