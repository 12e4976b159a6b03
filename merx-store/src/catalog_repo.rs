use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use merx_core::repository::CatalogStore;
use merx_core::StoreError;
use merx_shared::models::catalog::{NewProduct, Product};

pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price_cents: i64,
    stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product, StoreError> {
        Ok(Product {
            id: Uuid::parse_str(&self.id).map_err(StoreError::backend)?,
            name: self.name,
            price_cents: self.price_cents,
            stock: self.stock,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, stock, is_active, created_at, updated_at";

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn create_product(&self, new: &NewProduct) -> Result<Product, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO products (id, name, price_cents, stock, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
        )
        .bind(id.to_string())
        .bind(&new.name)
        .bind(new.price_cents)
        .bind(new.stock)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(Product {
            id,
            name: new.name.clone(),
            price_cents: new.price_cents,
            stock: new.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(ProductRow::into_product).transpose()
    }

    async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1 OR ?1
             ORDER BY created_at DESC"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    async fn update_product(
        &self,
        id: Uuid,
        name: Option<String>,
        price_cents: Option<i64>,
    ) -> Result<Product, StoreError> {
        let result = sqlx::query(
            "UPDATE products
             SET name = COALESCE(?2, name),
                 price_cents = COALESCE(?3, price_cents),
                 updated_at = ?4
             WHERE id = ?1",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }

        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    async fn deactivate_product(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    async fn adjust_stock(&self, id: Uuid, delta: i64) -> Result<i64, StoreError> {
        // The conditional update is the oversell guard: the decrement only
        // lands if the balance stays non-negative.
        let new_stock: Option<i64> = sqlx::query_scalar(
            "UPDATE products
             SET stock = stock + ?2, updated_at = ?3
             WHERE id = ?1 AND stock + ?2 >= 0
             RETURNING stock",
        )
        .bind(id.to_string())
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if let Some(stock) = new_stock {
            return Ok(stock);
        }

        // Nothing updated: distinguish a missing product from a shortfall.
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        match available {
            None => Err(StoreError::NotFound(format!("product {id}"))),
            Some(available) => Err(StoreError::InsufficientStock {
                product_id: id,
                requested: -delta,
                available,
            }),
        }
    }
}
