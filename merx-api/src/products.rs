use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use merx_core::AuthContext;
use merx_shared::models::catalog::NewProduct;

use crate::error::{success, success_message, ApiError};
use crate::middleware::auth::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let product = state.catalog.create_product(body).await?;
    Ok((StatusCode::CREATED, success(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl IntoResponse, ApiError> {
    // Inactive products are an admin-only view.
    let include_inactive = params.include_inactive && ctx.is_admin();
    let products = state.catalog.list_products(include_inactive).await?;
    Ok(success(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.get_product(id).await?;
    Ok(success(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let product = state.catalog.update_product(id, body.name, body.price_cents).await?;
    Ok(success(product))
}

pub async fn deactivate_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    state.catalog.deactivate_product(id).await?;
    Ok(success_message("product deactivated"))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&ctx)?;
    let stock = state.ledger.adjust(id, body.delta).await?;
    Ok(success(serde_json::json!({ "product_id": id, "stock": stock })))
}
