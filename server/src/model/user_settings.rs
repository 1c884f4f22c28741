use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{db_core::prelude::*, error::AppResult};

pub const DEFAULT_SUMMARY_LENGTH: &str = "Medium";
pub const DEFAULT_THEME: &str = "light";

fn default_summary_length() -> String {
    DEFAULT_SUMMARY_LENGTH.to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_summary_length")]
    pub summary_length: String,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            summary_length: default_summary_length(),
            theme: default_theme(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsRecord {
    pub user_id: String,
    #[serde(flatten)]
    pub preferences: Preferences,
    pub gmail_auth_requested: bool,
    pub gmail_auth_requested_at: Option<DateTime<FixedOffset>>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<user_settings::Model> for SettingsRecord {
    fn from(m: user_settings::Model) -> Self {
        Self {
            user_id: m.user_id,
            preferences: Preferences {
                summary_length: m.summary_length,
                theme: m.theme,
            },
            gmail_auth_requested: m.gmail_auth_requested,
            gmail_auth_requested_at: m.gmail_auth_requested_at,
            updated_at: m.updated_at,
        }
    }
}

#[async_trait]
pub trait UserSettingsStore: Send + Sync {
    async fn get(&self, user_id: &str) -> AppResult<Option<SettingsRecord>>;

    async fn save_preferences(&self, user_id: &str, preferences: &Preferences) -> AppResult<()>;

    async fn flag_gmail_auth_requested(&self, user_id: &str) -> AppResult<()>;
}

pub struct UserSettingsCtrl;

impl UserSettingsCtrl {
    pub async fn get(conn: &DatabaseConnection, user_id: &str) -> AppResult<Option<SettingsRecord>> {
        let settings = UserSettings::find_by_id(user_id.to_string())
            .one(conn)
            .await?;

        Ok(settings.map(SettingsRecord::from))
    }

    fn new_row(user_id: &str, preferences: &Preferences) -> user_settings::ActiveModel {
        user_settings::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            summary_length: ActiveValue::Set(preferences.summary_length.clone()),
            theme: ActiveValue::Set(preferences.theme.clone()),
            gmail_auth_requested: ActiveValue::Set(false),
            gmail_auth_requested_at: ActiveValue::Set(None),
            updated_at: ActiveValue::Set(chrono::Utc::now().into()),
        }
    }

    pub async fn upsert_preferences(
        conn: &DatabaseConnection,
        user_id: &str,
        preferences: &Preferences,
    ) -> AppResult<()> {
        UserSettings::insert(Self::new_row(user_id, preferences))
            .on_conflict(
                OnConflict::column(user_settings::Column::UserId)
                    .update_columns([
                        user_settings::Column::SummaryLength,
                        user_settings::Column::Theme,
                        user_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    pub async fn flag_gmail_auth_requested(
        conn: &DatabaseConnection,
        user_id: &str,
    ) -> AppResult<()> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        let mut row = Self::new_row(user_id, &Preferences::default());
        row.gmail_auth_requested = ActiveValue::Set(true);
        row.gmail_auth_requested_at = ActiveValue::Set(Some(now));

        UserSettings::insert(row)
            .on_conflict(
                OnConflict::column(user_settings::Column::UserId)
                    .update_columns([
                        user_settings::Column::GmailAuthRequested,
                        user_settings::Column::GmailAuthRequestedAt,
                        user_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserSettingsStore for DatabaseConnection {
    async fn get(&self, user_id: &str) -> AppResult<Option<SettingsRecord>> {
        UserSettingsCtrl::get(self, user_id).await
    }

    async fn save_preferences(&self, user_id: &str, preferences: &Preferences) -> AppResult<()> {
        UserSettingsCtrl::upsert_preferences(self, user_id, preferences).await
    }

    async fn flag_gmail_auth_requested(&self, user_id: &str) -> AppResult<()> {
        UserSettingsCtrl::flag_gmail_auth_requested(self, user_id).await
    }
}
