use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use merx_core::payment::GatewayError;
use merx_core::DomainError;

/// Success envelope shared by every handler.
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "data": data }))
}

pub fn success_message(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "message": message }))
}

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Forbidden(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Domain(err) => {
                let status = match &err {
                    DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                    DomainError::Validation(_)
                    | DomainError::StateConflict(_)
                    | DomainError::InsufficientStock { .. }
                    | DomainError::UnsupportedGateway(_) => StatusCode::BAD_REQUEST,
                    DomainError::Gateway(GatewayError::Declined(_)) => StatusCode::PAYMENT_REQUIRED,
                    DomainError::Gateway(GatewayError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
                    DomainError::Gateway(GatewayError::Provider(_)) => StatusCode::BAD_GATEWAY,
                    DomainError::PostChargePersistence { .. } | DomainError::Store(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                let message = match &err {
                    // Backend detail stays in the log; the charged-but-
                    // unpersisted case is logged loudly for reconciliation.
                    DomainError::PostChargePersistence { .. } => {
                        tracing::error!(error = %err, "settlement persistence failure");
                        "internal server error".to_string()
                    }
                    DomainError::Store(_) => {
                        tracing::error!(error = %err, "storage failure");
                        "internal server error".to_string()
                    }
                    other => other.to_string(),
                };

                (status, message)
            }
        };

        let body = Json(json!({ "status": "error", "message": message }));
        (status, body).into_response()
    }
}
