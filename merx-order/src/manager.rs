use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use merx_core::repository::{CatalogStore, OrderStore};
use merx_core::{DomainError, DomainResult};
use merx_shared::models::events::OrderPlacedEvent;
use merx_shared::models::order::{FulfillmentStatus, NewOrder, NewOrderItem, Order};
use merx_shared::models::payment::PaymentStatus;

use crate::notify::Notifier;

/// A requested line item, before price snapshotting.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// Order lifecycle: creation with all-or-nothing stock reservation, and the
/// two independent status fields with their transition tables.
pub struct OrderManager {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
    notifier: Arc<Notifier>,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self { orders, catalog, notifier }
    }

    /// Validate the request, snapshot unit prices, and persist the order.
    /// Stock for every line item is reserved inside the store's transaction;
    /// the first shortfall rolls everything back.
    pub async fn place_order(
        &self,
        customer_id: &str,
        lines: Vec<OrderLine>,
        payment_method: Option<String>,
        shipping_address: String,
        phone: String,
    ) -> DomainResult<Order> {
        if lines.is_empty() {
            return Err(DomainError::Validation("order must contain at least one item".into()));
        }
        if shipping_address.trim().is_empty() {
            return Err(DomainError::Validation("shipping address must not be empty".into()));
        }
        if phone.trim().is_empty() {
            return Err(DomainError::Validation("phone number must not be empty".into()));
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            if line.quantity < 1 {
                return Err(DomainError::Validation(format!(
                    "quantity for product {} must be at least 1",
                    line.product_id
                )));
            }
            let product = self
                .catalog
                .get_product(line.product_id)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("product {}", line.product_id)))?;
            if !product.is_active {
                return Err(DomainError::Validation(format!(
                    "product {} is no longer available",
                    product.id
                )));
            }
            items.push(NewOrderItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
            });
        }

        let total_cents = items.iter().map(|i| i.unit_price_cents * i.quantity).sum();
        let new_order = NewOrder {
            customer_id: customer_id.to_string(),
            items,
            total_cents,
            payment_method,
            shipping_address,
            phone,
        };

        let order = self.orders.create_order(&new_order).await?;

        let event = OrderPlacedEvent {
            order_id: order.id,
            customer_id: order.customer_id.clone(),
            total_cents: order.total_cents,
            item_count: order.items.len(),
            timestamp: Utc::now().timestamp(),
        };
        tracing::info!(
            target: "merx::telemetry",
            event = %serde_json::to_string(&event).unwrap_or_default(),
            "order placed"
        );

        if let Err(err) = self.notifier.order_status_changed(&order).await {
            tracing::warn!(order_id = order.id, %err, "failed to record order notification");
        }

        Ok(order)
    }

    pub async fn get_order(&self, id: i64) -> DomainResult<Order> {
        self.orders
            .get_order(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {id}")))
    }

    pub async fn list_orders_for(&self, customer_id: &str) -> DomainResult<Vec<Order>> {
        Ok(self.orders.list_orders(Some(customer_id)).await?)
    }

    pub async fn list_all_orders(&self) -> DomainResult<Vec<Order>> {
        Ok(self.orders.list_orders(None).await?)
    }

    /// Admin-driven fulfillment update, checked against the forward-only
    /// transition table.
    pub async fn update_fulfillment_status(
        &self,
        id: i64,
        next: FulfillmentStatus,
    ) -> DomainResult<Order> {
        let order = self.get_order(id).await?;
        if !order.fulfillment_status.can_become(next) {
            return Err(DomainError::StateConflict(format!(
                "order {id} cannot move from {} to {next}",
                order.fulfillment_status
            )));
        }

        let updated = self.orders.update_statuses(id, next, order.payment_status).await?;
        if let Err(err) = self.notifier.order_status_changed(&updated).await {
            tracing::warn!(order_id = id, %err, "failed to record order notification");
        }
        Ok(updated)
    }

    /// Admin-driven payment status update. Completing payment on a pending
    /// order advances fulfillment to PROCESSING (the one coupling rule).
    pub async fn update_payment_status(
        &self,
        id: i64,
        next: PaymentStatus,
    ) -> DomainResult<Order> {
        let order = self.get_order(id).await?;
        if !order.payment_status.order_can_become(next) {
            return Err(DomainError::StateConflict(format!(
                "order {id} payment cannot move from {} to {next}",
                order.payment_status
            )));
        }

        let fulfillment = order.coupled_fulfillment(next);
        let updated = self.orders.update_statuses(id, fulfillment, next).await?;
        if let Err(err) = self.notifier.payment_status_changed(&updated).await {
            tracing::warn!(order_id = id, %err, "failed to record payment notification");
        }
        Ok(updated)
    }
}
