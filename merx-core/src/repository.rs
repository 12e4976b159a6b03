//! Storage contracts. Implementations must honour the transactional
//! guarantees called out on each method: where a method describes several
//! writes, they commit or roll back as one unit.

use async_trait::async_trait;
use uuid::Uuid;

use merx_shared::models::catalog::{NewProduct, Product};
use merx_shared::models::notification::{NewNotification, Notification};
use merx_shared::models::order::{FulfillmentStatus, NewOrder, Order};
use merx_shared::models::payment::{NewPayment, Payment, PaymentStatus};

use crate::error::StoreError;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_product(&self, new: &NewProduct) -> Result<Product, StoreError>;

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>, StoreError>;

    async fn update_product(
        &self,
        id: Uuid,
        name: Option<String>,
        price_cents: Option<i64>,
    ) -> Result<Product, StoreError>;

    async fn deactivate_product(&self, id: Uuid) -> Result<(), StoreError>;

    /// Atomically apply `delta` to the product's stock and return the new
    /// level. A negative delta that would take stock below zero must leave
    /// stock unchanged and report `InsufficientStock` with the available
    /// quantity. This conditional update is the oversell guard.
    async fn adjust_stock(&self, id: Uuid, delta: i64) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order with its items and reserve stock for every line
    /// item in one transaction. The first item that cannot be reserved
    /// rolls the whole transaction back, leaving earlier reservations
    /// undone.
    async fn create_order(&self, new: &NewOrder) -> Result<Order, StoreError>;

    async fn get_order(&self, id: i64) -> Result<Option<Order>, StoreError>;

    /// `customer_id = None` lists every order (admin surface).
    async fn list_orders(&self, customer_id: Option<&str>) -> Result<Vec<Order>, StoreError>;

    async fn update_statuses(
        &self,
        id: i64,
        fulfillment: FulfillmentStatus,
        payment: PaymentStatus,
    ) -> Result<Order, StoreError>;

    /// One transaction: release every line item's reserved stock and set
    /// fulfillment to CANCELLED. Must refuse (Conflict) if the order has
    /// shipped, been delivered, or is already cancelled.
    async fn cancel_order(&self, id: i64) -> Result<Order, StoreError>;

    /// One transaction: insert the COMPLETED payment row and mark the order
    /// paid, applying the pending→processing auto-advance. Refuses
    /// (Conflict) if the order is already paid, so a double settlement can
    /// never produce two payment rows.
    async fn settle_payment(
        &self,
        order_id: i64,
        new: &NewPayment,
    ) -> Result<(Order, Payment), StoreError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, StoreError>;

    async fn list_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, StoreError>;

    /// One transaction: payment COMPLETED→REFUNDED plus the order's payment
    /// status propagated to REFUNDED.
    async fn mark_refunded(&self, payment_id: i64) -> Result<Payment, StoreError>;

    async fn mark_cancelled(&self, payment_id: i64) -> Result<Payment, StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError>;

    /// Sets the sent flag; the sent timestamp is recorded the first time
    /// only.
    async fn mark_sent(&self, id: i64) -> Result<Notification, StoreError>;

    /// The customer's own messages plus broadcasts.
    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Notification>, StoreError>;
}
