use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use merx_core::repository::PaymentStore;
use merx_core::StoreError;
use merx_shared::models::payment::{Payment, PaymentStatus};

pub struct SqlitePaymentStore {
    pool: SqlitePool,
}

impl SqlitePaymentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(PaymentRow::into_payment).transpose()
    }
}

const PAYMENT_COLUMNS: &str =
    "id, order_id, transaction_id, gateway, amount_cents, status, gateway_response, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    transaction_id: Option<String>,
    gateway: String,
    amount_cents: i64,
    status: String,
    gateway_response: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, StoreError> {
        let status = PaymentStatus::parse(&self.status)
            .ok_or_else(|| StoreError::backend(format!("bad payment status {}", self.status)))?;
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            transaction_id: self.transaction_id,
            gateway: self.gateway,
            amount_cents: self.amount_cents,
            status,
            gateway_response: self.gateway_response,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl PaymentStore for SqlitePaymentStore {
    async fn get_payment(&self, id: i64) -> Result<Option<Payment>, StoreError> {
        self.fetch_payment(id).await
    }

    async fn list_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, StoreError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn mark_refunded(&self, payment_id: i64) -> Result<Payment, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        // The payment flip and the order propagation commit together.
        let order_id: Option<i64> = sqlx::query_scalar(
            "UPDATE payments SET status = 'REFUNDED', updated_at = ?2
             WHERE id = ?1 AND status = 'COMPLETED'
             RETURNING order_id",
        )
        .bind(payment_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        let Some(order_id) = order_id else {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM payments WHERE id = ?1")
                    .bind(payment_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(StoreError::backend)?;

            return Err(match status {
                None => StoreError::NotFound(format!("payment {payment_id}")),
                Some(status) => StoreError::Conflict(format!(
                    "payment {payment_id} is {status} and cannot be refunded"
                )),
            });
        };

        sqlx::query(
            "UPDATE orders SET payment_status = 'REFUNDED', updated_at = ?2
             WHERE id = ?1 AND payment_status = 'COMPLETED'",
        )
        .bind(order_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;

        self.fetch_payment(payment_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("payment {payment_id}")))
    }

    async fn mark_cancelled(&self, payment_id: i64) -> Result<Payment, StoreError> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'CANCELLED', updated_at = ?2
             WHERE id = ?1 AND status IN ('PENDING', 'COMPLETED')",
        )
        .bind(payment_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM payments WHERE id = ?1")
                    .bind(payment_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(StoreError::backend)?;

            return Err(match status {
                None => StoreError::NotFound(format!("payment {payment_id}")),
                Some(status) => StoreError::Conflict(format!(
                    "payment {payment_id} is {status} and cannot be cancelled"
                )),
            });
        }

        self.fetch_payment(payment_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("payment {payment_id}")))
    }
}
