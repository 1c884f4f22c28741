use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    auth::jwt::Claims,
    email::EmailRecord,
    error::AppJsonResult,
    model::{NewSummary, SummaryStore},
    prompt::{EmailAgent, MappedAnalysis},
    util::body_preview,
};

fn default_sender() -> String {
    "Unknown".to_string()
}

fn default_summary_length() -> String {
    "Medium".to_string()
}

/// # POST /api/summarize

#[derive(Debug, Deserialize)]
pub struct SummarizeBody {
    pub email_body: String,
    pub email_subject: String,
    #[serde(default = "default_sender")]
    pub email_sender: String,
    /// Short, Medium or Detailed
    #[serde(default = "default_summary_length")]
    pub summary_length: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    #[serde(flatten)]
    pub analysis: MappedAnalysis,
    pub model: Option<String>,
}

pub async fn summarize(
    claims: Claims,
    State(agent): State<EmailAgent>,
    State(summaries): State<Arc<dyn SummaryStore>>,
    Json(body): Json<SummarizeBody>,
) -> AppJsonResult<SummarizeResponse> {
    tracing::info!(
        "Summarizing email for {} (length {})",
        claims.sub,
        body.summary_length
    );

    let email = EmailRecord {
        id: "manual".to_string(),
        sender: body.email_sender,
        subject: body.email_subject,
        date: Utc::now().to_rfc3339(),
        body: body.email_body,
    };

    let generated = agent.summarize(&email).await;
    let analysis = MappedAnalysis::from(&generated.value);

    summaries
        .insert(NewSummary {
            user_id: claims.sub,
            email_id: None,
            sender: email.sender,
            subject: email.subject,
            date: email.date,
            body_preview: body_preview(&email.body),
            mapped: analysis.clone(),
            draft_reply: None,
            model: generated.model.clone(),
            unread: false,
        })
        .await?;

    Ok(Json(SummarizeResponse {
        analysis,
        model: generated.model,
    }))
}
