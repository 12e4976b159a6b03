use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    OrderStatus,
    PaymentStatus,
    Promotion,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::OrderStatus => "order_status",
            NotificationCategory::PaymentStatus => "payment_status",
            NotificationCategory::Promotion => "promotion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order_status" => Some(NotificationCategory::OrderStatus),
            "payment_status" => Some(NotificationCategory::PaymentStatus),
            "promotion" => Some(NotificationCategory::Promotion),
            _ => None,
        }
    }
}

/// An outbound message tied to a customer (or everyone, when `customer_id`
/// is `None`). `sent_at` is set exactly when the sent flag flips to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub customer_id: Option<String>,
    pub message: String,
    pub category: NotificationCategory,
    pub scheduled_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub customer_id: Option<String>,
    pub message: String,
    pub category: NotificationCategory,
    pub scheduled_at: DateTime<Utc>,
}
