pub mod gmail;
pub mod health;
pub mod preferences;
pub mod summaries;
pub mod summarize;

use crate::{
    auth::jwt::Claims,
    error::{AppError, AppResult},
};

/// Users may only read or clear their own data.
fn ensure_owner(claims: &Claims, user_id: &str) -> AppResult<()> {
    if claims.sub != user_id {
        tracing::warn!("User {} tried to access data of {}", claims.sub, user_id);
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}
