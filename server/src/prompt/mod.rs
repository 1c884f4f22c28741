pub mod analysis;
pub mod email_agent;
pub mod field_map;
pub mod gemini;

use indoc::formatdoc;

use crate::email::EmailRecord;

pub use analysis::{normalize, Analysis};
pub use email_agent::{BatchItem, EmailAgent, Generated};
pub use field_map::{Category, MappedAnalysis, Tone, Urgency};
pub use gemini::{GeminiApi, GenerateContent, Invocation, ModelClient};

pub fn summary_prompt(email: &EmailRecord) -> String {
    formatdoc! {r#"
        Analyze this email and provide a structured response.

        Email Details:
        From: {sender}
        Subject: {subject}
        Date: {date}

        Body:
        {body}

        Provide your analysis in the following JSON format:
        {{
            "summary": "2-3 sentence summary of the email",
            "key_points": ["point 1", "point 2"],
            "action_items": ["action 1", "action 2"],
            "urgency": "low|medium|high",
            "category": "work|personal|newsletter|promotional",
            "sentiment": "positive|neutral|negative"
        }}

        Respond ONLY with the JSON, no additional text."#,
        sender = email.sender,
        subject = email.subject,
        date = email.date,
        body = email.body,
    }
}

pub fn reply_prompt(email: &EmailRecord, tone: &str) -> String {
    formatdoc! {"
        Generate a {tone} email reply to the following email.

        Original Email:
        From: {sender}
        Subject: {subject}
        Body: {body}

        Generate a clear, concise, and appropriate response. Include:
        1. Proper greeting
        2. Acknowledgment of the email
        3. Response to key points
        4. Professional closing

        Keep it under 150 words. Respond with ONLY the email body, no subject line or additional formatting.",
        sender = email.sender,
        subject = email.subject,
        body = email.body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::common::sample_email;

    #[test]
    fn test_summary_prompt_embeds_email() {
        let prompt = summary_prompt(&sample_email("m1"));
        assert!(prompt.starts_with("Analyze this email"));
        assert!(prompt.contains("From: Alice <alice@x.com>"));
        assert!(prompt.contains("Subject: Invoice"));
        assert!(prompt.contains("\"urgency\": \"low|medium|high\""));
        assert!(prompt.ends_with("Respond ONLY with the JSON, no additional text."));
    }

    #[test]
    fn test_reply_prompt_uses_tone() {
        let prompt = reply_prompt(&sample_email("m1"), "friendly");
        assert!(prompt.starts_with("Generate a friendly email reply"));
        assert!(prompt.contains("Body: Please pay the invoice by Friday."));
        assert!(prompt.contains("under 150 words"));
    }
}
