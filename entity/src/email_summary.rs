//! `SeaORM` Entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_summary")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: String,
    pub email_id: Option<String>,
    pub sender: String,
    pub subject: String,
    pub date: String,
    #[sea_orm(column_type = "Text")]
    pub body_preview: String,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    pub urgency: String,
    pub tone: String,
    pub category: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub key_points: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub action_items: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub draft_reply: Option<String>,
    pub model: Option<String>,
    pub unread: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
