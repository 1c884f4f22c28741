pub mod client;
pub mod message;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::GmailClient;

/// One fetched message, already cleaned for prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

/// The mailbox the server reads unread mail from and replies through.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Most recent unread messages, newest first, at most `max_count`.
    async fn fetch_unread(&self, max_count: usize) -> anyhow::Result<Vec<EmailRecord>>;

    async fn send_reply(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;

    async fn mark_as_read(&self, message_id: &str) -> anyhow::Result<()>;
}
