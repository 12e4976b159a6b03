use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settlement state, used both for an order's payment-status field and for
/// individual payment records. The two transition tables differ and are
/// expressed by [`PaymentStatus::order_can_become`] and
/// [`PaymentStatus::record_can_become`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    /// Transitions permitted on an order's payment-status field.
    /// A failed settlement may be retried; a completed one may only be
    /// refunded. Orders never carry a CANCELLED payment status.
    pub fn order_can_become(self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Failed) | (Failed, Completed) | (Completed, Refunded)
        )
    }

    /// Transitions permitted on a payment record: one-directional only.
    pub fn record_can_become(self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Completed, Refunded) | (Completed, Cancelled) | (Pending, Cancelled)
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settled (or later refunded/cancelled) charge against an order.
/// Created only as the result of a successful gateway charge; the amount is
/// fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub transaction_id: Option<String>,
    pub gateway: String,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub gateway_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub transaction_id: String,
    pub gateway: String,
    pub amount_cents: i64,
    pub gateway_response: Option<String>,
}
