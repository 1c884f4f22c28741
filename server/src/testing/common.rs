use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    auth::jwt::TokenVerifier,
    email::{EmailRecord, Mailbox},
    error::{AppError, AppResult},
    model::{NewSummary, Preferences, SettingsRecord, StoredSummary, SummaryStore, UserSettingsStore},
    prompt::{gemini::AttemptOutcome, EmailAgent, GenerateContent, ModelClient},
    routes::AppRouter,
    server_config::ServerConfig,
    ServerState,
};

pub const TEST_SECRET: &str = "6d61696c6d696e642d746573742d736563726574";

type Respond = dyn Fn(&str, &str) -> AttemptOutcome + Send + Sync;

/// Model endpoint answering from a closure, recording every call.
#[derive(Clone)]
pub struct ScriptedModel {
    respond: Arc<Respond>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedModel {
    pub fn new(respond: impl Fn(&str, &str) -> AttemptOutcome + Send + Sync + 'static) -> Self {
        Self {
            respond: Arc::new(respond),
            calls: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn always(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| AttemptOutcome::Success(text.clone()))
    }

    /// Models called, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl GenerateContent for ScriptedModel {
    async fn generate(&self, model: &str, prompt: &str) -> AttemptOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        (self.respond)(model, prompt)
    }
}

pub fn sample_email(id: &str) -> EmailRecord {
    EmailRecord {
        id: id.to_string(),
        sender: "Alice <alice@x.com>".to_string(),
        subject: "Invoice".to_string(),
        date: "Fri, 17 Oct 2025 09:30:00 +0000".to_string(),
        body: "Please pay the invoice by Friday.".to_string(),
    }
}

pub fn stored_summary(user_id: &str, subject: &str, urgency: &str, category: &str) -> StoredSummary {
    StoredSummary {
        id: 0,
        user_id: user_id.to_string(),
        email_id: None,
        sender: "Alice <alice@x.com>".to_string(),
        subject: subject.to_string(),
        date: "Unknown".to_string(),
        body_preview: String::new(),
        summary: format!("Summary of {subject}"),
        urgency: urgency.to_string(),
        tone: "Neutral".to_string(),
        category: category.to_string(),
        key_points: vec![],
        action_items: vec![],
        draft_reply: None,
        model: None,
        unread: true,
        created_at: Utc::now().into(),
    }
}

/// In-memory stand-in for both database stores.
#[derive(Default)]
pub struct MemoryStore {
    summaries: Mutex<Vec<StoredSummary>>,
    settings: Mutex<HashMap<String, SettingsRecord>>,
    failing_email_ids: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn push(&self, mut summary: StoredSummary) {
        let mut summaries = self.summaries.lock().unwrap();
        summary.id = summaries.len() as i32 + 1;
        summaries.push(summary);
    }

    pub fn summaries(&self) -> Vec<StoredSummary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn settings(&self, user_id: &str) -> Option<SettingsRecord> {
        self.settings.lock().unwrap().get(user_id).cloned()
    }

    /// Makes inserts for this email fail.
    pub fn fail_on(&self, email_id: &str) {
        self.failing_email_ids
            .lock()
            .unwrap()
            .push(email_id.to_string());
    }

    fn default_settings(user_id: &str) -> SettingsRecord {
        SettingsRecord {
            user_id: user_id.to_string(),
            preferences: Preferences::default(),
            gmail_auth_requested: false,
            gmail_auth_requested_at: None,
            updated_at: Utc::now().into(),
        }
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn insert(&self, new: NewSummary) -> AppResult<StoredSummary> {
        if let Some(email_id) = &new.email_id {
            if self.failing_email_ids.lock().unwrap().contains(email_id) {
                return Err(AppError::Internal(anyhow::anyhow!("insert failed")));
            }
        }

        let summary = StoredSummary {
            id: 0,
            user_id: new.user_id,
            email_id: new.email_id,
            sender: new.sender,
            subject: new.subject,
            date: new.date,
            body_preview: new.body_preview,
            summary: new.mapped.summary,
            urgency: new.mapped.urgency.to_string(),
            tone: new.mapped.tone.to_string(),
            category: new.mapped.category.to_string(),
            key_points: new.mapped.key_points,
            action_items: new.mapped.action_items,
            draft_reply: new.draft_reply,
            model: new.model,
            unread: new.unread,
            created_at: Utc::now().into(),
        };
        self.push(summary);

        Ok(self
            .summaries
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("summary just pushed"))
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<StoredSummary>> {
        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_by_user(&self, user_id: &str) -> AppResult<u64> {
        let mut summaries = self.summaries.lock().unwrap();
        let before = summaries.len();
        summaries.retain(|s| s.user_id != user_id);
        Ok((before - summaries.len()) as u64)
    }

    async fn mark_read(&self, user_id: &str, summary_id: i32) -> AppResult<()> {
        let mut summaries = self.summaries.lock().unwrap();
        for summary in summaries.iter_mut() {
            if summary.id == summary_id && summary.user_id == user_id {
                summary.unread = false;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserSettingsStore for MemoryStore {
    async fn get(&self, user_id: &str) -> AppResult<Option<SettingsRecord>> {
        Ok(self.settings(user_id))
    }

    async fn save_preferences(&self, user_id: &str, preferences: &Preferences) -> AppResult<()> {
        let mut settings = self.settings.lock().unwrap();
        let record = settings
            .entry(user_id.to_string())
            .or_insert_with(|| Self::default_settings(user_id));
        record.preferences = preferences.clone();
        record.updated_at = Utc::now().into();
        Ok(())
    }

    async fn flag_gmail_auth_requested(&self, user_id: &str) -> AppResult<()> {
        let mut settings = self.settings.lock().unwrap();
        let record = settings
            .entry(user_id.to_string())
            .or_insert_with(|| Self::default_settings(user_id));
        record.gmail_auth_requested = true;
        record.gmail_auth_requested_at = Some(Utc::now().into());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMailbox {
    unread: Vec<EmailRecord>,
    requested: Mutex<Vec<usize>>,
    sent: Mutex<Vec<(String, String, String)>>,
    marked: Mutex<Vec<String>>,
    unmarkable: Vec<String>,
}

impl FakeMailbox {
    pub fn with_unread(unread: Vec<EmailRecord>) -> Self {
        Self {
            unread,
            ..Default::default()
        }
    }

    /// Makes `mark_as_read` fail for this message.
    pub fn fail_mark_on(mut self, message_id: &str) -> Self {
        self.unmarkable.push(message_id.to_string());
        self
    }

    pub fn requested_counts(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn marked(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn fetch_unread(&self, max_count: usize) -> anyhow::Result<Vec<EmailRecord>> {
        self.requested.lock().unwrap().push(max_count);
        Ok(self.unread.iter().take(max_count).cloned().collect())
    }

    async fn send_reply(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }

    async fn mark_as_read(&self, message_id: &str) -> anyhow::Result<()> {
        if self.unmarkable.iter().any(|id| id == message_id) {
            anyhow::bail!("modify failed for {message_id}");
        }
        self.marked.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

pub struct TestContext {
    pub state: ServerState,
    pub store: Arc<MemoryStore>,
    pub mailbox: Arc<FakeMailbox>,
    pub model: ScriptedModel,
}

/// Server state over in-memory collaborators. Models are `primary` then `backup`.
pub fn test_context(model: ScriptedModel, mailbox: Option<FakeMailbox>) -> TestContext {
    let mut config = ServerConfig::default();
    config.gemini.api_key = "test-key".to_string();
    config.gemini.models = vec!["primary".to_string(), "backup".to_string()];
    config.auth.jwt_secret = Some(TEST_SECRET.to_string());

    let agent = EmailAgent::new(ModelClient::new(
        Arc::new(model.clone()),
        config.gemini.models.clone(),
    ));
    let store = Arc::new(MemoryStore::default());
    let gmail_configured = mailbox.is_some();
    let mailbox = Arc::new(mailbox.unwrap_or_default());

    let state = ServerState {
        agent,
        summaries: store.clone(),
        settings: store.clone(),
        mailbox: gmail_configured.then(|| mailbox.clone() as Arc<dyn Mailbox>),
        verifier: Arc::new(TokenVerifier::with_secret(TEST_SECRET).unwrap()),
        config: Arc::new(config),
    };

    TestContext {
        state,
        store,
        mailbox,
        model,
    }
}

pub fn bearer(user_id: &str) -> String {
    TokenVerifier::with_secret(TEST_SECRET)
        .unwrap()
        .issue(user_id, Some(&format!("{user_id}@example.com")), 300)
        .unwrap()
}

pub async fn read_json(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    (status, body)
}

/// Sends one request through the full router, authenticated as `user_id`.
pub async fn call(
    ctx: &TestContext,
    method: &str,
    uri: &str,
    user_id: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        req = req.header("authorization", format!("Bearer {}", bearer(user_id)));
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = AppRouter::create(ctx.state.clone())
        .oneshot(req)
        .await
        .unwrap();
    read_json(resp).await
}
