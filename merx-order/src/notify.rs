use std::sync::Arc;

use chrono::{DateTime, Utc};

use merx_core::repository::NotificationStore;
use merx_core::DomainResult;
use merx_shared::models::notification::{NewNotification, Notification, NotificationCategory};
use merx_shared::models::order::{FulfillmentStatus, Order};
use merx_shared::models::payment::PaymentStatus;

/// Template for each fulfillment stage.
pub fn fulfillment_message(order_id: i64, status: FulfillmentStatus) -> String {
    match status {
        FulfillmentStatus::Pending => {
            format!("Order #{order_id} has been received and is awaiting processing")
        }
        FulfillmentStatus::Processing => format!("Order #{order_id} is being processed"),
        FulfillmentStatus::Shipped => format!("Order #{order_id} has been shipped"),
        FulfillmentStatus::Delivered => format!("Order #{order_id} has been delivered"),
        FulfillmentStatus::Cancelled => format!("Order #{order_id} has been cancelled"),
    }
}

/// Template for each payment stage, with a generic fallback for states that
/// have no dedicated wording.
pub fn payment_message(order_id: i64, status: PaymentStatus) -> String {
    match status {
        PaymentStatus::Pending => format!("Payment for order #{order_id} is pending"),
        PaymentStatus::Completed => format!("Payment for order #{order_id} completed successfully"),
        PaymentStatus::Failed => format!("Payment for order #{order_id} failed"),
        PaymentStatus::Refunded => format!("Payment for order #{order_id} has been refunded"),
        other => format!("Order #{order_id} status changed to {other}"),
    }
}

/// Records outbound messages; a pure side-effect recorder, no delivery
/// transport behind it.
pub struct Notifier {
    store: Arc<dyn NotificationStore>,
}

impl Notifier {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn emit(
        &self,
        customer_id: Option<String>,
        message: String,
        category: NotificationCategory,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Notification> {
        let new = NewNotification {
            customer_id,
            message,
            category,
            scheduled_at: scheduled_at.unwrap_or_else(Utc::now),
        };
        Ok(self.store.insert(&new).await?)
    }

    pub async fn order_status_changed(&self, order: &Order) -> DomainResult<Notification> {
        self.emit(
            Some(order.customer_id.clone()),
            fulfillment_message(order.id, order.fulfillment_status),
            NotificationCategory::OrderStatus,
            None,
        )
        .await
    }

    pub async fn payment_status_changed(&self, order: &Order) -> DomainResult<Notification> {
        self.emit(
            Some(order.customer_id.clone()),
            payment_message(order.id, order.payment_status),
            NotificationCategory::PaymentStatus,
            None,
        )
        .await
    }

    pub async fn mark_sent(&self, id: i64) -> DomainResult<Notification> {
        Ok(self.store.mark_sent(id).await?)
    }

    /// A customer's own messages plus broadcasts.
    pub async fn feed(&self, customer_id: &str) -> DomainResult<Vec<Notification>> {
        Ok(self.store.list_for_customer(customer_id).await?)
    }
}
