use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use lettre::message::{header::ContentType, Mailbox as Address};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::{server_config::GmailConfig, util::check_expired, HttpClient};

use super::{EmailRecord, Mailbox};

/// Gmail API error response structure
#[derive(Debug, Clone, Deserialize)]
pub struct GmailApiError {
    pub error: GmailApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    #[serde(default)]
    raw: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Gmail REST client for a single mailbox authorized with a long-lived
/// refresh token.
pub struct GmailClient {
    http_client: HttpClient,
    config: GmailConfig,
    access_token: RwLock<Option<AccessToken>>,
}

impl GmailClient {
    pub fn new(http_client: HttpClient, config: GmailConfig) -> Self {
        Self {
            http_client,
            config,
            access_token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn access_token(&self) -> anyhow::Result<String> {
        {
            let cached = self.access_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !check_expired(token.expires_at) {
                    return Ok(token.token.clone());
                }
            }
        }

        let refreshed = self.exchange_refresh_token().await?;
        let token = refreshed.token.clone();
        *self.access_token.write().await = Some(refreshed);

        Ok(token)
    }

    async fn exchange_refresh_token(&self) -> anyhow::Result<AccessToken> {
        let GmailConfig {
            token_uri,
            client_id,
            client_secret,
            refresh_token,
            ..
        } = &self.config;

        let resp = self
            .http_client
            .post(token_uri)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Error refreshing Gmail token")?;

        let resp = resp.json::<serde_json::Value>().await?;
        if resp.get("error").is_some() {
            let desc = resp
                .get("error_description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error");
            tracing::error!("Gmail token refresh failed: {}", desc);
            return Err(anyhow!("Gmail not authorized: {desc}"));
        }

        let resp = serde_json::from_value::<RefreshTokenResponse>(resp)
            .context("Unexpected token response")?;
        tracing::debug!("Refreshed Gmail access token, expires in {}s", resp.expires_in);

        Ok(AccessToken {
            token: resp.access_token,
            expires_at: Utc::now() + Duration::seconds(resp.expires_in),
        })
    }

    async fn check_response(resp: reqwest::Response, action: &str) -> anyhow::Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<GmailApiError>(&text) {
            Ok(GmailApiError { error }) => Err(anyhow!(
                "Error {action}: {} {} ({})",
                error.code,
                error.message,
                error.status.unwrap_or_default()
            )),
            Err(_) => Err(anyhow!("Error {action}: {status} {text}")),
        }
    }

    async fn list_unread_ids(&self, max_count: usize) -> anyhow::Result<Vec<String>> {
        let token = self.access_token().await?;
        let resp = self
            .http_client
            .get(self.url("messages"))
            .bearer_auth(&token)
            .query(&[
                ("q", self.config.unread_query.clone()),
                ("maxResults", max_count.to_string()),
            ])
            .send()
            .await?;

        let list = Self::check_response(resp, "listing messages")
            .await?
            .json::<ListMessagesResponse>()
            .await?;

        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_record(&self, message_id: &str) -> anyhow::Result<EmailRecord> {
        let token = self.access_token().await?;
        let resp = self
            .http_client
            .get(self.url(&format!("messages/{message_id}")))
            .bearer_auth(&token)
            .query(&[("format", "raw")])
            .send()
            .await?;

        let msg = Self::check_response(resp, "getting message")
            .await?
            .json::<RawMessage>()
            .await?;
        let raw = msg
            .raw
            .context(format!("No raw message found for {}", msg.id))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim_end_matches('='))
            .context("Raw message was not base64url")?;

        EmailRecord::from_raw(&msg.id, &bytes, self.config.body_max_chars)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn fetch_unread(&self, max_count: usize) -> anyhow::Result<Vec<EmailRecord>> {
        let ids = self.list_unread_ids(max_count).await?;
        if ids.is_empty() {
            tracing::info!("No unread emails found");
            return Ok(vec![]);
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids.iter().take(max_count) {
            match self.get_record(id).await {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping message {}: {:#}", id, e),
            }
        }

        Ok(records)
    }

    async fn send_reply(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let raw = build_reply(&self.config.address, recipient, subject, body)?;
        let token = self.access_token().await?;
        let resp = self
            .http_client
            .post(self.url("messages/send"))
            .bearer_auth(&token)
            .json(&json!({ "raw": URL_SAFE_NO_PAD.encode(raw) }))
            .send()
            .await?;
        Self::check_response(resp, "sending reply").await?;

        tracing::info!("Reply sent to {}", recipient);
        Ok(())
    }

    async fn mark_as_read(&self, message_id: &str) -> anyhow::Result<()> {
        let token = self.access_token().await?;
        let resp = self
            .http_client
            .post(self.url(&format!("messages/{message_id}/modify")))
            .bearer_auth(&token)
            .json(&json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        Self::check_response(resp, "marking message read").await?;

        tracing::debug!("Marked email {} as read", message_id);
        Ok(())
    }
}

pub fn reply_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject.to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Formats a plain text reply as RFC 822 bytes.
pub fn build_reply(from: &str, to: &str, subject: &str, body: &str) -> anyhow::Result<Vec<u8>> {
    let message = lettre::Message::builder()
        .from(from.parse::<Address>().context("Invalid sender address")?)
        .to(to.parse::<Address>().context("Invalid recipient address")?)
        .subject(reply_subject(subject))
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;

    Ok(message.formatted())
}
