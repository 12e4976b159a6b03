use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use merx_core::{AuthContext, DomainError};
use merx_order::OrderLine;
use merx_shared::models::order::FulfillmentStatus;
use merx_shared::models::payment::PaymentStatus;

use crate::error::{success, ApiError};
use crate::middleware::auth::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLine>,
    pub payment_method: Option<String>,
    pub shipping_address: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub fulfillment_status: Option<String>,
    pub payment_status: Option<String>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .orders
        .place_order(
            &ctx.customer_id,
            body.items,
            body.payment_method,
            body.shipping_address,
            body.phone,
        )
        .await?;
    Ok((StatusCode::CREATED, success(order)))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.orders.list_orders_for(&ctx.customer_id).await?;
    Ok(success(orders))
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let orders = state.orders.list_all_orders().await?;
    Ok(success(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.orders.get_order(id).await?;
    if !ctx.can_access_order(&order) {
        return Err(ApiError::Forbidden("not your order".to_string()));
    }
    Ok(success(order))
}

/// Admin status update. Either field may be present; each goes through its
/// own transition table.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;

    let fulfillment = body
        .fulfillment_status
        .as_deref()
        .map(|raw| {
            FulfillmentStatus::parse(raw)
                .ok_or_else(|| DomainError::Validation(format!("unknown fulfillment status {raw}")))
        })
        .transpose()?;
    let payment = body
        .payment_status
        .as_deref()
        .map(|raw| {
            PaymentStatus::parse(raw)
                .ok_or_else(|| DomainError::Validation(format!("unknown payment status {raw}")))
        })
        .transpose()?;

    let mut order = None;
    if let Some(next) = fulfillment {
        order = Some(state.orders.update_fulfillment_status(id, next).await?);
    }
    if let Some(next) = payment {
        order = Some(state.orders.update_payment_status(id, next).await?);
    }

    let order = order.ok_or_else(|| {
        DomainError::Validation(
            "at least one of fulfillment_status or payment_status is required".to_string(),
        )
    })?;
    Ok(success(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.orders.get_order(id).await?;
    if !ctx.can_access_order(&order) {
        return Err(ApiError::Forbidden("not your order".to_string()));
    }
    let cancelled = state.settlement.cancel_order(id).await?;
    Ok(success(cancelled))
}
