use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::PaymentStatus;

/// Physical delivery lifecycle of an order, independent of payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "PENDING",
            FulfillmentStatus::Processing => "PROCESSING",
            FulfillmentStatus::Shipped => "SHIPPED",
            FulfillmentStatus::Delivered => "DELIVERED",
            FulfillmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(FulfillmentStatus::Pending),
            "PROCESSING" => Some(FulfillmentStatus::Processing),
            "SHIPPED" => Some(FulfillmentStatus::Shipped),
            "DELIVERED" => Some(FulfillmentStatus::Delivered),
            "CANCELLED" => Some(FulfillmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Position in the forward delivery sequence; CANCELLED sits outside it.
    fn rank(self) -> Option<u8> {
        match self {
            FulfillmentStatus::Pending => Some(0),
            FulfillmentStatus::Processing => Some(1),
            FulfillmentStatus::Shipped => Some(2),
            FulfillmentStatus::Delivered => Some(3),
            FulfillmentStatus::Cancelled => None,
        }
    }

    /// Transitions are monotonic forward, except CANCELLED which is
    /// reachable from any state that has not shipped yet.
    pub fn can_become(self, next: Self) -> bool {
        match (self.rank(), next.rank()) {
            // Cancelled is terminal.
            (None, _) => false,
            // Into Cancelled: only before shipping.
            (Some(rank), None) => rank < 2,
            (Some(from), Some(to)) => to > from,
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order. The total and per-item unit prices are snapshots taken
/// at creation and are never recomputed, regardless of later catalog price
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub shipping_address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The one cross-field coupling rule: a completed payment on a
    /// still-pending order advances fulfillment to PROCESSING.
    pub fn coupled_fulfillment(&self, next_payment: PaymentStatus) -> FulfillmentStatus {
        if next_payment == PaymentStatus::Completed
            && self.fulfillment_status == FulfillmentStatus::Pending
        {
            FulfillmentStatus::Processing
        } else {
            self.fulfillment_status
        }
    }
}

/// A line item, exclusively owned by its order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Uuid,
    pub quantity: i64,
    /// Unit price captured at order time.
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: String,
    pub items: Vec<NewOrderItem>,
    pub total_cents: i64,
    pub payment_method: Option<String>,
    pub shipping_address: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price_cents: i64,
}
