use uuid::Uuid;

use crate::payment::GatewayError;

/// Failures surfaced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflicting state: {0}")]
    Conflict(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// The error taxonomy every core operation reports through. The HTTP layer
/// maps each kind to a status code; nothing here panics.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("unsupported payment gateway: {0}")]
    UnsupportedGateway(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The acknowledged gap: the gateway accepted the charge but the
    /// settlement write did not persist. The charge is not reversed
    /// automatically; the transaction id is surfaced for manual
    /// reconciliation.
    #[error("charge {transaction_id} on gateway {gateway} succeeded but settlement for order {order_id} was not persisted: {source}")]
    PostChargePersistence {
        order_id: i64,
        gateway: String,
        transaction_id: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => DomainError::NotFound(what),
            StoreError::Conflict(msg) => DomainError::StateConflict(msg),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => DomainError::Store(other),
        }
    }
}
