use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::jwt::Claims,
    email::{EmailRecord, Mailbox},
    error::{AppError, AppJsonResult, AppResult},
    model::{NewSummary, StoredSummary, SummaryStore, UserSettingsStore},
    prompt::{email_agent::DEFAULT_TONE, EmailAgent, MappedAnalysis},
    server_config::ServerConfig,
    util::body_preview,
};

fn require_mailbox(mailbox: Option<Arc<dyn Mailbox>>) -> AppResult<Arc<dyn Mailbox>> {
    mailbox.ok_or_else(|| AppError::Unauthorized("Gmail not authorized".to_string()))
}

/// # POST /api/gmail/authorize
pub async fn authorize(
    claims: Claims,
    State(settings): State<Arc<dyn UserSettingsStore>>,
    State(mailbox): State<Option<Arc<dyn Mailbox>>>,
) -> AppJsonResult<serde_json::Value> {
    settings.flag_gmail_auth_requested(&claims.sub).await?;

    let gmail_configured = mailbox.is_some();
    let message = if gmail_configured {
        "Gmail is connected on the server."
    } else {
        "Gmail authorization requested. Configure Gmail credentials on the server to complete it."
    };

    Ok(Json(json!({
        "success": true,
        "gmail_configured": gmail_configured,
        "message": message,
    })))
}

/// # POST /api/gmail/fetch

fn default_max_results() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct FetchBody {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub mark_as_read: bool,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub success: bool,
    pub emails_processed: usize,
    pub emails: Vec<StoredSummary>,
    pub message: String,
}

pub async fn fetch(
    claims: Claims,
    State(agent): State<EmailAgent>,
    State(summaries): State<Arc<dyn SummaryStore>>,
    State(mailbox): State<Option<Arc<dyn Mailbox>>>,
    State(config): State<Arc<ServerConfig>>,
    Json(body): Json<FetchBody>,
) -> AppJsonResult<FetchResponse> {
    let mailbox = require_mailbox(mailbox)?;
    let max_results = body.max_results.min(config.batch.max_emails);
    tracing::info!("Fetching up to {} emails for user {}", max_results, claims.sub);

    let emails = mailbox.fetch_unread(max_results).await?;
    if emails.is_empty() {
        return Ok(Json(FetchResponse {
            success: true,
            emails_processed: 0,
            emails: vec![],
            message: "No unread emails found".to_string(),
        }));
    }

    let fetched = emails.len();
    let mut processed = Vec::with_capacity(fetched);
    for item in agent.process_batch(&emails).await {
        let email_id = item.email.id.clone();
        let new = NewSummary {
            user_id: claims.sub.clone(),
            email_id: Some(item.email.id),
            sender: item.email.sender,
            subject: item.email.subject,
            date: item.email.date,
            body_preview: body_preview(&item.email.body),
            mapped: MappedAnalysis::from(&item.analysis),
            draft_reply: Some(item.draft_reply),
            model: item.model,
            unread: true,
        };

        let mut stored = match summaries.insert(new).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Error saving summary for email {}: {:?}", email_id, e);
                continue;
            }
        };

        if body.mark_as_read {
            match mailbox.mark_as_read(&email_id).await {
                Ok(()) => match summaries.mark_read(&claims.sub, stored.id).await {
                    Ok(()) => stored.unread = false,
                    Err(e) => tracing::warn!("Could not flag summary {} read: {:?}", stored.id, e),
                },
                Err(e) => tracing::warn!("Could not mark email {} as read: {:#}", email_id, e),
            }
        }
        processed.push(stored);
    }

    tracing::info!("Processed {} of {} emails", processed.len(), fetched);
    Ok(Json(FetchResponse {
        success: true,
        emails_processed: processed.len(),
        message: format!("Processed {} out of {} emails", processed.len(), fetched),
        emails: processed,
    }))
}

/// # POST /api/gmail/reply

fn default_tone() -> String {
    DEFAULT_TONE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
    pub email_id: String,
    pub email_subject: String,
    pub email_body: String,
    pub email_sender: String,
    #[serde(default = "default_tone")]
    pub tone: String,
}

pub async fn reply(
    _claims: Claims,
    State(agent): State<EmailAgent>,
    Json(body): Json<ReplyBody>,
) -> AppJsonResult<serde_json::Value> {
    let email = EmailRecord {
        id: body.email_id,
        sender: body.email_sender,
        subject: body.email_subject,
        date: Utc::now().to_rfc3339(),
        body: body.email_body,
    };

    let reply = agent.generate_reply(&email, &body.tone).await;

    Ok(Json(json!({
        "success": true,
        "draft_reply": reply.value,
        "tone": body.tone,
        "model": reply.model,
    })))
}

/// # POST /api/gmail/send

#[derive(Debug, Deserialize)]
pub struct SendBody {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub async fn send(
    claims: Claims,
    State(mailbox): State<Option<Arc<dyn Mailbox>>>,
    Json(SendBody { to, subject, body }): Json<SendBody>,
) -> AppJsonResult<serde_json::Value> {
    let mailbox = require_mailbox(mailbox)?;
    if to.trim().is_empty() {
        return Err(AppError::BadRequest("Recipient is required".to_string()));
    }
    if to.parse::<lettre::message::Mailbox>().is_err() {
        return Err(AppError::BadRequest(format!("Invalid recipient address: {to}")));
    }
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("Reply body is required".to_string()));
    }

    tracing::info!("User {} sending reply to {}", claims.sub, to);
    mailbox.send_reply(&to, &subject, &body).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Reply sent to {to}"),
    })))
}
