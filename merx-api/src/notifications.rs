use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use merx_core::{AuthContext, DomainError};
use merx_shared::models::notification::NotificationCategory;

use crate::error::{success, ApiError};
use crate::middleware::auth::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    /// Absent means broadcast to every customer.
    pub customer_id: Option<String>,
    pub message: String,
    pub category: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

pub async fn my_feed(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let feed = state.notifier.feed(&ctx.customer_id).await?;
    Ok(success(feed))
}

pub async fn send(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<SendNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;

    if body.message.trim().is_empty() {
        return Err(DomainError::Validation("message must not be empty".to_string()).into());
    }

    let category = match &body.category {
        None => NotificationCategory::Promotion,
        Some(raw) => NotificationCategory::parse(raw).ok_or_else(|| {
            DomainError::Validation(format!("unknown notification category {raw}"))
        })?,
    };

    let notification = state
        .notifier
        .emit(body.customer_id, body.message, category, body.scheduled_at)
        .await?;
    Ok((StatusCode::CREATED, success(notification)))
}

pub async fn mark_sent(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let notification = state.notifier.mark_sent(id).await?;
    Ok(success(notification))
}
