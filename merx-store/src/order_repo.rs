use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use merx_core::repository::OrderStore;
use merx_core::StoreError;
use merx_shared::models::order::{FulfillmentStatus, NewOrder, Order, OrderItem};
use merx_shared::models::payment::{NewPayment, Payment, PaymentStatus};

pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, customer_id, total_cents, fulfillment_status, payment_status,
                    payment_method, shipping_address, phone, created_at, updated_at
             FROM orders WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let Some(row) = row else { return Ok(None) };

        let items: Vec<ItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, unit_price_cents
             FROM order_items WHERE order_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(Some(row.into_order(items)?))
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: String,
    total_cents: i64,
    fulfillment_status: String,
    payment_status: String,
    payment_method: Option<String>,
    shipping_address: String,
    phone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<ItemRow>) -> Result<Order, StoreError> {
        let fulfillment_status = FulfillmentStatus::parse(&self.fulfillment_status)
            .ok_or_else(|| {
                StoreError::backend(format!("bad fulfillment status {}", self.fulfillment_status))
            })?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::backend(format!("bad payment status {}", self.payment_status))
        })?;

        let items = items
            .into_iter()
            .map(ItemRow::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            items,
            total_cents: self.total_cents,
            fulfillment_status,
            payment_status,
            payment_method: self.payment_method,
            shipping_address: self.shipping_address,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    order_id: i64,
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
}

impl ItemRow {
    fn into_item(self) -> Result<OrderItem, StoreError> {
        Ok(OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: Uuid::parse_str(&self.product_id).map_err(StoreError::backend)?,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
        })
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn create_order(&self, new: &NewOrder) -> Result<Order, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        // Reserve every line item inside the transaction; the first
        // shortfall returns early and the dropped transaction rolls back
        // the earlier reservations.
        for item in &new.items {
            let reserved: Option<i64> = sqlx::query_scalar(
                "UPDATE products
                 SET stock = stock - ?2, updated_at = ?3
                 WHERE id = ?1 AND stock >= ?2
                 RETURNING stock",
            )
            .bind(item.product_id.to_string())
            .bind(item.quantity)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

            if reserved.is_none() {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                        .bind(item.product_id.to_string())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(StoreError::backend)?;

                return Err(match available {
                    None => StoreError::NotFound(format!("product {}", item.product_id)),
                    Some(available) => StoreError::InsufficientStock {
                        product_id: item.product_id,
                        requested: item.quantity,
                        available,
                    },
                });
            }
        }

        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (customer_id, total_cents, fulfillment_status, payment_status,
                                 payment_method, shipping_address, phone, created_at, updated_at)
             VALUES (?1, ?2, 'PENDING', 'PENDING', ?3, ?4, ?5, ?6, ?7)
             RETURNING id",
        )
        .bind(&new.customer_id)
        .bind(new.total_cents)
        .bind(&new.payment_method)
        .bind(&new.shipping_address)
        .bind(&new.phone)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        for item in &new.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(order_id)
            .bind(item.product_id.to_string())
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)?;

        self.fetch_order(order_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        self.fetch_order(id).await
    }

    async fn list_orders(&self, customer_id: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let ids: Vec<i64> = match customer_id {
            Some(customer_id) => {
                sqlx::query_scalar(
                    "SELECT id FROM orders WHERE customer_id = ?1 ORDER BY created_at DESC",
                )
                .bind(customer_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar("SELECT id FROM orders ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(StoreError::backend)?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.fetch_order(id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn update_statuses(
        &self,
        id: i64,
        fulfillment: FulfillmentStatus,
        payment: PaymentStatus,
    ) -> Result<Order, StoreError> {
        let result = sqlx::query(
            "UPDATE orders
             SET fulfillment_status = ?2, payment_status = ?3, updated_at = ?4
             WHERE id = ?1",
        )
        .bind(id)
        .bind(fulfillment.as_str())
        .bind(payment.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {id}")));
        }

        self.fetch_order(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    async fn cancel_order(&self, id: i64) -> Result<Order, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        // Status guard re-checked here so a racing ship/cancel can neither
        // cancel a shipped order nor release stock twice.
        let result = sqlx::query(
            "UPDATE orders SET fulfillment_status = 'CANCELLED', updated_at = ?2
             WHERE id = ?1
               AND fulfillment_status NOT IN ('SHIPPED', 'DELIVERED', 'CANCELLED')",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            let status: Option<String> =
                sqlx::query_scalar("SELECT fulfillment_status FROM orders WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(StoreError::backend)?;

            return Err(match status {
                None => StoreError::NotFound(format!("order {id}")),
                Some(status) => {
                    StoreError::Conflict(format!("order {id} cannot be cancelled in status {status}"))
                }
            });
        }

        let items: Vec<ItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, unit_price_cents
             FROM order_items WHERE order_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        for item in &items {
            sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(&item.product_id)
                .bind(item.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)?;

        self.fetch_order(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    async fn settle_payment(
        &self,
        order_id: i64,
        new: &NewPayment,
    ) -> Result<(Order, Payment), StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        // Marking the order paid and inserting the payment row commit
        // together; the already-paid guard here makes a concurrent double
        // settlement impossible.
        let result = sqlx::query(
            "UPDATE orders
             SET payment_status = 'COMPLETED',
                 fulfillment_status = CASE WHEN fulfillment_status = 'PENDING'
                                           THEN 'PROCESSING'
                                           ELSE fulfillment_status END,
                 updated_at = ?2
             WHERE id = ?1 AND payment_status <> 'COMPLETED'",
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::backend)?;

            return Err(match exists {
                None => StoreError::NotFound(format!("order {order_id}")),
                Some(_) => StoreError::Conflict(format!("order {order_id} is already paid")),
            });
        }

        let payment_id: i64 = sqlx::query_scalar(
            "INSERT INTO payments (order_id, transaction_id, gateway, amount_cents, status,
                                   gateway_response, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'COMPLETED', ?5, ?6, ?7)
             RETURNING id",
        )
        .bind(order_id)
        .bind(&new.transaction_id)
        .bind(&new.gateway)
        .bind(new.amount_cents)
        .bind(&new.gateway_response)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;

        let order = self
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;

        let payment = Payment {
            id: payment_id,
            order_id,
            transaction_id: Some(new.transaction_id.clone()),
            gateway: new.gateway.clone(),
            amount_cents: new.amount_cents,
            status: PaymentStatus::Completed,
            gateway_response: new.gateway_response.clone(),
            created_at: now,
            updated_at: now,
        };

        Ok((order, payment))
    }
}
