use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{email::Mailbox, prompt::EmailAgent};

/// # GET /
pub async fn health(
    State(agent): State<EmailAgent>,
    State(mailbox): State<Option<Arc<dyn Mailbox>>>,
) -> Json<Value> {
    Json(json!({
        "status": "active",
        "service": "MailMind API",
        "version": env!("CARGO_PKG_VERSION"),
        "gemini_status": "active",
        "models": agent.models(),
        "model": agent.primary_model().unwrap_or("N/A"),
        "gmail_configured": mailbox.is_some(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
