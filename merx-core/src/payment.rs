use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use merx_shared::models::order::Order;

/// Gateway-side view of a charge, as reported by `query_status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeState {
    Pending,
    Succeeded,
    Failed,
    Refunded,
    Cancelled,
}

/// Proof of a successful charge.
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    /// Free-text provider response, persisted verbatim on the payment row.
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payment gateway timed out")]
    Timeout,

    #[error("payment gateway error: {0}")]
    Provider(String),
}

/// Capability set every payment provider implements. Providers are selected
/// by configured name at request time and must be interchangeable behind
/// this trait.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Attempt to charge the order's total. A decline is an error, not a
    /// receipt.
    async fn charge(&self, order: &Order) -> Result<ChargeReceipt, GatewayError>;

    async fn query_status(&self, transaction_id: &str) -> Result<ChargeState, GatewayError>;

    async fn cancel(&self, transaction_id: &str) -> Result<(), GatewayError>;

    async fn refund(
        &self,
        transaction_id: &str,
        amount_cents: i64,
    ) -> Result<RefundReceipt, GatewayError>;
}
