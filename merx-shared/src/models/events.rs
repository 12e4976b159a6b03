//! Telemetry events emitted as structured log records by the order and
//! settlement layers.

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderPlacedEvent {
    pub order_id: i64,
    pub customer_id: String,
    pub total_cents: i64,
    pub item_count: usize,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderPaidEvent {
    pub order_id: i64,
    pub customer_id: String,
    pub gateway: String,
    pub amount_cents: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCancelledEvent {
    pub order_id: i64,
    pub customer_id: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentRefundedEvent {
    pub payment_id: i64,
    pub order_id: i64,
    pub amount_cents: i64,
    pub timestamp: i64,
}
