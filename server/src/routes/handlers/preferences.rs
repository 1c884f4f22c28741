use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::json;

use crate::{
    auth::jwt::Claims,
    error::AppJsonResult,
    model::{Preferences, UserSettingsStore},
};

/// # GET /api/user/preferences
pub async fn get(
    claims: Claims,
    State(settings): State<Arc<dyn UserSettingsStore>>,
) -> AppJsonResult<serde_json::Value> {
    let preferences = settings
        .get(&claims.sub)
        .await?
        .map(|s| s.preferences)
        .unwrap_or_default();

    Ok(Json(json!({
        "success": true,
        "preferences": preferences,
    })))
}

/// # POST /api/user/preferences
pub async fn update(
    claims: Claims,
    State(settings): State<Arc<dyn UserSettingsStore>>,
    Json(preferences): Json<Preferences>,
) -> AppJsonResult<serde_json::Value> {
    settings.save_preferences(&claims.sub, &preferences).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Preferences updated successfully",
    })))
}
