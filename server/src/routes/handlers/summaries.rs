use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::IntoEnumIterator;

use crate::{
    auth::jwt::Claims,
    error::AppJsonResult,
    model::{StoredSummary, SummaryStore},
    prompt::{Category, Urgency},
};

use super::ensure_owner;

const HOURS_SAVED_PER_EMAIL: f64 = 0.015;
const MAX_LIST_LIMIT: u64 = 500;

fn default_limit() -> u64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl ListParams {
    pub fn limit(&self) -> u64 {
        self.limit.min(MAX_LIST_LIMIT)
    }
}

/// Rounds to one decimal place from the exact binary value, so 0.15 (stored
/// as 0.1499..) becomes 0.1.
fn round_tenths(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// # GET /api/summaries/:user_id
pub async fn list(
    claims: Claims,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
    State(summaries): State<Arc<dyn SummaryStore>>,
) -> AppJsonResult<serde_json::Value> {
    ensure_owner(&claims, &user_id)?;

    let results = summaries
        .find_by_user(&user_id, Some(params.limit()))
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": results.len(),
        "summaries": results,
    })))
}

/// # DELETE /api/summaries/:user_id
pub async fn clear(
    claims: Claims,
    Path(user_id): Path<String>,
    State(summaries): State<Arc<dyn SummaryStore>>,
) -> AppJsonResult<serde_json::Value> {
    ensure_owner(&claims, &user_id)?;

    let deleted_count = summaries.delete_by_user(&user_id).await?;
    tracing::info!("Cleared {} summaries for {}", deleted_count, user_id);

    Ok(Json(json!({
        "success": true,
        "deleted_count": deleted_count,
        "message": format!("Cleared {deleted_count} summaries"),
    })))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Analytics {
    pub success: bool,
    pub total_emails: usize,
    pub urgency_breakdown: BTreeMap<String, usize>,
    pub category_breakdown: BTreeMap<String, usize>,
    pub estimated_time_saved_hours: f64,
}

impl Analytics {
    pub fn from_summaries(summaries: &[StoredSummary]) -> Self {
        let mut urgency_breakdown: BTreeMap<String, usize> =
            Urgency::iter().map(|u| (u.to_string(), 0)).collect();
        let mut category_breakdown: BTreeMap<String, usize> =
            Category::iter().map(|c| (c.to_string(), 0)).collect();

        for summary in summaries {
            let urgency = summary.urgency.parse().unwrap_or(Urgency::Medium);
            let category = summary.category.parse().unwrap_or(Category::Other);
            *urgency_breakdown.entry(urgency.to_string()).or_default() += 1;
            *category_breakdown.entry(category.to_string()).or_default() += 1;
        }

        let total = summaries.len();
        Self {
            success: true,
            total_emails: total,
            urgency_breakdown,
            category_breakdown,
            estimated_time_saved_hours: round_tenths(total as f64 * HOURS_SAVED_PER_EMAIL),
        }
    }
}

/// # GET /api/analytics/:user_id
pub async fn analytics(
    claims: Claims,
    Path(user_id): Path<String>,
    State(summaries): State<Arc<dyn SummaryStore>>,
) -> AppJsonResult<Analytics> {
    ensure_owner(&claims, &user_id)?;

    let all = summaries.find_by_user(&user_id, None).await?;

    Ok(Json(Analytics::from_summaries(&all)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::testing::common::{call, stored_summary, test_context, ScriptedModel};

    #[tokio::test]
    async fn test_list_is_newest_first_and_limited() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        for subject in ["first", "second", "third"] {
            ctx.store.push(stored_summary("user-1", subject, "High", "Work"));
        }
        ctx.store.push(stored_summary("user-2", "other", "Low", "Personal"));

        let (status, body) = call(
            &ctx,
            "GET",
            "/api/summaries/user-1?limit=2",
            Some("user-1"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["summaries"][0]["subject"], "third");
        assert_eq!(body["summaries"][1]["subject"], "second");
    }

    #[tokio::test]
    async fn test_other_users_data_is_forbidden() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        ctx.store.push(stored_summary("user-2", "other", "Low", "Personal"));

        for (method, uri) in [
            ("GET", "/api/summaries/user-2"),
            ("DELETE", "/api/summaries/user-2"),
            ("GET", "/api/analytics/user-2"),
        ] {
            let (status, body) = call(&ctx, method, uri, Some("user-1"), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(body["error"]["message"], "Access denied");
        }
        assert_eq!(ctx.store.summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_reports_count() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        ctx.store.push(stored_summary("user-1", "a", "High", "Work"));
        ctx.store.push(stored_summary("user-1", "b", "Low", "Work"));
        ctx.store.push(stored_summary("user-2", "c", "Low", "Work"));

        let (status, body) = call(&ctx, "DELETE", "/api/summaries/user-1", Some("user-1"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_count"], 2);
        assert_eq!(body["message"], "Cleared 2 summaries");
        assert_eq!(ctx.store.summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_analytics_breakdown() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        ctx.store.push(stored_summary("user-1", "a", "High", "Work"));
        ctx.store.push(stored_summary("user-1", "b", "High", "Promotion"));
        ctx.store.push(stored_summary("user-1", "c", "Low", "Work"));

        let (status, body) = call(&ctx, "GET", "/api/analytics/user-1", Some("user-1"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_emails"], 3);
        assert_eq!(body["urgency_breakdown"]["High"], 2);
        assert_eq!(body["urgency_breakdown"]["Medium"], 0);
        assert_eq!(body["urgency_breakdown"]["Low"], 1);
        assert_eq!(body["category_breakdown"]["Work"], 2);
        assert_eq!(body["category_breakdown"]["Promotion"], 1);
        assert_eq!(body["category_breakdown"]["Other"], 0);
        assert_eq!(body["estimated_time_saved_hours"], 0.0);
    }

    #[test]
    fn test_time_saved_rounding() {
        let summaries: Vec<_> = (0..100)
            .map(|i| stored_summary("u", &i.to_string(), "Medium", "Other"))
            .collect();
        let analytics = Analytics::from_summaries(&summaries);
        assert_eq!(analytics.estimated_time_saved_hours, 1.5);
        assert_eq!(analytics.urgency_breakdown["Medium"], 100);

        assert_eq!(Analytics::from_summaries(&[]).estimated_time_saved_hours, 0.0);
    }

    #[test]
    fn test_time_saved_rounds_exact_value() {
        let summaries: Vec<_> = (0..10)
            .map(|i| stored_summary("u", &i.to_string(), "Low", "Work"))
            .collect();
        assert_eq!(Analytics::from_summaries(&summaries).estimated_time_saved_hours, 0.1);

        assert_eq!(round_tenths(0.36), 0.4);
    }

    #[test]
    fn test_list_limit_is_capped() {
        let params = ListParams { limit: u64::MAX };
        assert_eq!(params.limit(), MAX_LIST_LIMIT);
        assert_eq!(ListParams { limit: 20 }.limit(), 20);
    }

    #[tokio::test]
    async fn test_list_with_huge_limit() {
        let ctx = test_context(ScriptedModel::always("{}"), None);
        ctx.store.push(stored_summary("user-1", "only", "High", "Work"));

        let (status, body) = call(
            &ctx,
            "GET",
            "/api/summaries/user-1?limit=18446744073709551615",
            Some("user-1"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }
}
