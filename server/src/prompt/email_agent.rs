use std::sync::Arc;

use serde::Serialize;

use crate::email::EmailRecord;

use super::{analysis::normalize, reply_prompt, summary_prompt, Analysis, ModelClient};

pub const DEFAULT_TONE: &str = "professional";
pub const FALLBACK_REPLY: &str = "Error generating reply. Please try again.";

/// A value produced by the model chain, with the model that served it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generated<T> {
    pub value: T,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub email: EmailRecord,
    pub analysis: Analysis,
    pub draft_reply: String,
    /// Model that produced the summary
    pub model: Option<String>,
}

/// Summaries and reply drafts for emails. Neither operation fails: when no
/// model answers, fixed fallback values are returned.
#[derive(Clone)]
pub struct EmailAgent {
    client: Arc<ModelClient>,
}

impl EmailAgent {
    pub fn new(client: ModelClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn models(&self) -> &[String] {
        self.client.models()
    }

    pub fn primary_model(&self) -> Option<&str> {
        self.client.primary_model()
    }

    pub async fn summarize(&self, email: &EmailRecord) -> Generated<Analysis> {
        let invocation = self.client.invoke(&summary_prompt(email)).await;
        if invocation.text.is_none() {
            tracing::warn!("No response from model for summary of {}", email.id);
        }

        Generated {
            value: normalize(invocation.text.as_deref()),
            model: invocation.model,
        }
    }

    pub async fn generate_reply(&self, email: &EmailRecord, tone: &str) -> Generated<String> {
        let invocation = self.client.invoke(&reply_prompt(email, tone)).await;
        let value = match invocation.text.as_deref().map(str::trim) {
            Some(reply) => reply.to_string(),
            None => {
                tracing::warn!("No response from model for reply to {}", email.id);
                FALLBACK_REPLY.to_string()
            }
        };

        Generated {
            value,
            model: invocation.model,
        }
    }

    /// Summarizes then drafts a reply for each email, one at a time, in order.
    pub async fn process_batch(&self, emails: &[EmailRecord]) -> Vec<BatchItem> {
        let mut results = Vec::with_capacity(emails.len());

        for (idx, email) in emails.iter().enumerate() {
            tracing::info!("Processing email {}/{}: {}", idx + 1, emails.len(), email.id);
            let summary = self.summarize(email).await;
            let reply = self.generate_reply(email, DEFAULT_TONE).await;

            results.push(BatchItem {
                email: email.clone(),
                analysis: summary.value,
                draft_reply: reply.value,
                model: summary.model,
            });
        }

        results
    }
}
