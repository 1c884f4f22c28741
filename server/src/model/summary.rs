use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{db_core::prelude::*, error::AppResult, prompt::MappedAnalysis};

/// Everything needed to persist one processed email.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub user_id: String,
    pub email_id: Option<String>,
    pub sender: String,
    pub subject: String,
    pub date: String,
    pub body_preview: String,
    pub mapped: MappedAnalysis,
    pub draft_reply: Option<String>,
    pub model: Option<String>,
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSummary {
    pub id: i32,
    pub user_id: String,
    pub email_id: Option<String>,
    #[serde(rename = "from")]
    pub sender: String,
    pub subject: String,
    pub date: String,
    pub body_preview: String,
    pub summary: String,
    pub urgency: String,
    pub tone: String,
    pub category: String,
    pub key_points: Vec<String>,
    pub action_items: Vec<String>,
    pub draft_reply: Option<String>,
    pub model: Option<String>,
    pub unread: bool,
    pub created_at: DateTime<FixedOffset>,
}

fn string_list(value: Json) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

impl From<email_summary::Model> for StoredSummary {
    fn from(m: email_summary::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            email_id: m.email_id,
            sender: m.sender,
            subject: m.subject,
            date: m.date,
            body_preview: m.body_preview,
            summary: m.summary,
            urgency: m.urgency,
            tone: m.tone,
            category: m.category,
            key_points: string_list(m.key_points),
            action_items: string_list(m.action_items),
            draft_reply: m.draft_reply,
            model: m.model,
            unread: m.unread,
            created_at: m.created_at,
        }
    }
}

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn insert(&self, summary: NewSummary) -> AppResult<StoredSummary>;

    /// Newest first.
    async fn find_by_user(&self, user_id: &str, limit: Option<u64>)
        -> AppResult<Vec<StoredSummary>>;

    /// Returns the number of rows removed.
    async fn delete_by_user(&self, user_id: &str) -> AppResult<u64>;

    async fn mark_read(&self, user_id: &str, summary_id: i32) -> AppResult<()>;
}

pub struct EmailSummaryCtrl;

impl EmailSummaryCtrl {
    pub async fn insert(conn: &DatabaseConnection, new: NewSummary) -> AppResult<StoredSummary> {
        let NewSummary {
            user_id,
            email_id,
            sender,
            subject,
            date,
            body_preview,
            mapped,
            draft_reply,
            model,
            unread,
        } = new;

        let active_model = email_summary::ActiveModel {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(user_id),
            email_id: ActiveValue::Set(email_id),
            sender: ActiveValue::Set(sender),
            subject: ActiveValue::Set(subject),
            date: ActiveValue::Set(date),
            body_preview: ActiveValue::Set(body_preview),
            summary: ActiveValue::Set(mapped.summary),
            urgency: ActiveValue::Set(mapped.urgency.to_string()),
            tone: ActiveValue::Set(mapped.tone.to_string()),
            category: ActiveValue::Set(mapped.category.to_string()),
            key_points: ActiveValue::Set(Json::from(mapped.key_points)),
            action_items: ActiveValue::Set(Json::from(mapped.action_items)),
            draft_reply: ActiveValue::Set(draft_reply),
            model: ActiveValue::Set(model),
            unread: ActiveValue::Set(unread),
            created_at: ActiveValue::Set(chrono::Utc::now().into()),
        };

        let inserted = active_model.insert(conn).await?;
        Ok(inserted.into())
    }

    pub async fn find_by_user(
        conn: &DatabaseConnection,
        user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<StoredSummary>> {
        let summaries = EmailSummary::find()
            .filter(email_summary::Column::UserId.eq(user_id))
            .order_by_desc(email_summary::Column::CreatedAt)
            .order_by_desc(email_summary::Column::Id)
            .limit(limit)
            .all(conn)
            .await?;

        Ok(summaries.into_iter().map(StoredSummary::from).collect())
    }

    pub async fn delete_by_user(conn: &DatabaseConnection, user_id: &str) -> AppResult<u64> {
        let result = EmailSummary::delete_many()
            .filter(email_summary::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn mark_read(conn: &DatabaseConnection, user_id: &str, id: i32) -> AppResult<()> {
        EmailSummary::update_many()
            .col_expr(email_summary::Column::Unread, Value::Bool(Some(false)).into())
            .filter(email_summary::Column::Id.eq(id))
            .filter(email_summary::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SummaryStore for DatabaseConnection {
    async fn insert(&self, summary: NewSummary) -> AppResult<StoredSummary> {
        EmailSummaryCtrl::insert(self, summary).await
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<StoredSummary>> {
        EmailSummaryCtrl::find_by_user(self, user_id, limit).await
    }

    async fn delete_by_user(&self, user_id: &str) -> AppResult<u64> {
        EmailSummaryCtrl::delete_by_user(self, user_id).await
    }

    async fn mark_read(&self, user_id: &str, summary_id: i32) -> AppResult<()> {
        EmailSummaryCtrl::mark_read(self, user_id, summary_id).await
    }
}
