use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::{email::message::truncate_chars, server_config::GeminiConfig, HttpClient};

const ERROR_EXCERPT_CHARS: usize = 200;

/// Result of a single request against a single model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    NotFound,
    Timeout,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Success,
    NotFound,
    Timeout,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub model: String,
    pub status: AttemptStatus,
}

/// What one pass over the fallback chain produced.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub text: Option<String>,
    /// Model that produced `text`
    pub model: Option<String>,
    pub attempts: Vec<Attempt>,
}

#[async_trait]
pub trait GenerateContent: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> AttemptOutcome;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate that has any.
    fn into_text(self) -> Option<String> {
        self.candidates.into_iter().find_map(|candidate| {
            let text = candidate
                .content?
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>();
            (!text.is_empty()).then_some(text)
        })
    }
}

/// `generateContent` over REST, authenticated with an API key.
pub struct GeminiApi {
    http_client: HttpClient,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiApi {
    pub fn new(http_client: HttpClient, config: &GeminiConfig) -> Self {
        Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl GenerateContent for GeminiApi {
    async fn generate(&self, model: &str, prompt: &str) -> AttemptOutcome {
        let url = format!("{}/{}:generateContent", self.endpoint, model);
        let resp = self
            .http_client
            .post(url)
            .query(&[("key", &self.api_key)])
            .timeout(self.timeout)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return AttemptOutcome::Timeout,
            Err(e) => return AttemptOutcome::Failed(e.without_url().to_string()),
        };

        match resp.status() {
            StatusCode::NOT_FOUND => AttemptOutcome::NotFound,
            status if status.is_success() => match resp.json::<GenerateContentResponse>().await {
                Ok(body) => body
                    .into_text()
                    .map(AttemptOutcome::Success)
                    .unwrap_or_else(|| AttemptOutcome::Failed("No candidate text".to_string())),
                Err(e) if e.is_timeout() => AttemptOutcome::Timeout,
                Err(e) => AttemptOutcome::Failed(format!("Malformed response: {}", e.without_url())),
            },
            status => {
                let body = resp.text().await.unwrap_or_default();
                AttemptOutcome::Failed(format!(
                    "{status}: {}",
                    truncate_chars(body.trim(), ERROR_EXCERPT_CHARS)
                ))
            }
        }
    }
}

/// Walks the configured models in priority order until one answers.
pub struct ModelClient {
    api: Arc<dyn GenerateContent>,
    models: Vec<String>,
}

impl ModelClient {
    pub fn new(api: Arc<dyn GenerateContent>, models: Vec<String>) -> Self {
        Self { api, models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn primary_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    pub async fn invoke(&self, prompt: &str) -> Invocation {
        let mut attempts = Vec::with_capacity(self.models.len());

        for model in &self.models {
            tracing::debug!("Trying model: {}", model);
            let status = match self.api.generate(model, prompt).await {
                AttemptOutcome::Success(text) => {
                    attempts.push(Attempt {
                        model: model.clone(),
                        status: AttemptStatus::Success,
                    });
                    return Invocation {
                        text: Some(text),
                        model: Some(model.clone()),
                        attempts,
                    };
                }
                AttemptOutcome::NotFound => {
                    tracing::info!("Model {} not found, trying next", model);
                    AttemptStatus::NotFound
                }
                AttemptOutcome::Timeout => {
                    tracing::warn!("Timeout with {}, trying next", model);
                    AttemptStatus::Timeout
                }
                AttemptOutcome::Failed(reason) => {
                    tracing::warn!("Error with {}: {}", model, reason);
                    AttemptStatus::Failed(reason)
                }
            };
            attempts.push(Attempt {
                model: model.clone(),
                status,
            });
        }

        tracing::error!("Could not reach any Gemini model");
        Invocation {
            text: None,
            model: None,
            attempts,
        }
    }
}
