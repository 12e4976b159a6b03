use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use merx_core::repository::PaymentStore;
use merx_core::{AuthContext, DomainError};

use crate::error::{success, ApiError};
use crate::middleware::auth::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PayOrderRequest {
    #[serde(default)]
    pub gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    #[serde(default)]
    pub amount_cents: Option<i64>,
}

pub async fn pay_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<PayOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.orders.get_order(id).await?;
    if !ctx.can_access_order(&order) {
        return Err(ApiError::Forbidden("not your order".to_string()));
    }

    // Gateway choice: request body, then the method recorded on the order,
    // then the configured default.
    let gateway = body
        .gateway
        .or(order.payment_method)
        .or_else(|| state.default_gateway.clone())
        .ok_or_else(|| DomainError::Validation("no payment gateway selected".to_string()))?;

    let (order, payment) = state.settlement.process_payment(id, &gateway).await?;
    Ok(success(serde_json::json!({ "order": order, "payment": payment })))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let payment = state
        .payments
        .get_payment(id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::NotFound(format!("payment {id}")))?;
    Ok(success(payment))
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<RefundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let payment = state.settlement.process_refund(id, body.amount_cents).await?;
    Ok(success(payment))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let payment = state.settlement.cancel_payment(id).await?;
    Ok(success(payment))
}
