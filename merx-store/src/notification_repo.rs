use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use merx_core::repository::NotificationStore;
use merx_core::StoreError;
use merx_shared::models::notification::{NewNotification, Notification, NotificationCategory};

pub struct SqliteNotificationStore {
    pool: SqlitePool,
}

impl SqliteNotificationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(NotificationRow::into_notification).transpose()
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, customer_id, message, category, scheduled_at, sent, sent_at";

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    customer_id: Option<String>,
    message: String,
    category: String,
    scheduled_at: DateTime<Utc>,
    sent: bool,
    sent_at: Option<DateTime<Utc>>,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification, StoreError> {
        let category = NotificationCategory::parse(&self.category).ok_or_else(|| {
            StoreError::backend(format!("bad notification category {}", self.category))
        })?;
        Ok(Notification {
            id: self.id,
            customer_id: self.customer_id,
            message: self.message,
            category,
            scheduled_at: self.scheduled_at,
            sent: self.sent,
            sent_at: self.sent_at,
        })
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO notifications (customer_id, message, category, scheduled_at, sent)
             VALUES (?1, ?2, ?3, ?4, 0)
             RETURNING id",
        )
        .bind(&new.customer_id)
        .bind(&new.message)
        .bind(new.category.as_str())
        .bind(new.scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(Notification {
            id,
            customer_id: new.customer_id.clone(),
            message: new.message.clone(),
            category: new.category,
            scheduled_at: new.scheduled_at,
            sent: false,
            sent_at: None,
        })
    }

    async fn mark_sent(&self, id: i64) -> Result<Notification, StoreError> {
        // Idempotent: the sent timestamp is only recorded the first time.
        let result = sqlx::query(
            "UPDATE notifications
             SET sent = 1, sent_at = COALESCE(sent_at, ?2)
             WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("notification {id}")));
        }

        self.fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("notification {id}")))
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE customer_id = ?1 OR customer_id IS NULL
             ORDER BY id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(NotificationRow::into_notification).collect()
    }
}
