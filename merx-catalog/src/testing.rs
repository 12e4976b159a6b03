//! In-memory `CatalogStore` used by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use merx_core::repository::CatalogStore;
use merx_core::StoreError;
use merx_shared::models::catalog::{NewProduct, Product};

#[derive(Default)]
pub struct MemoryCatalog {
    products: Mutex<HashMap<Uuid, Product>>,
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn create_product(&self, new: &NewProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            price_cents: new.price_cents,
            stock: new.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.products
            .lock()
            .map_err(StoreError::backend)?
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.lock().map_err(StoreError::backend)?.get(&id).cloned())
    }

    async fn list_products(&self, include_inactive: bool) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .lock()
            .map_err(StoreError::backend)?
            .values()
            .filter(|p| include_inactive || p.is_active)
            .cloned()
            .collect())
    }

    async fn update_product(
        &self,
        id: Uuid,
        name: Option<String>,
        price_cents: Option<i64>,
    ) -> Result<Product, StoreError> {
        let mut products = self.products.lock().map_err(StoreError::backend)?;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        if let Some(name) = name {
            product.name = name;
        }
        if let Some(price) = price_cents {
            product.price_cents = price;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn deactivate_product(&self, id: Uuid) -> Result<(), StoreError> {
        let mut products = self.products.lock().map_err(StoreError::backend)?;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        product.is_active = false;
        Ok(())
    }

    async fn adjust_stock(&self, id: Uuid, delta: i64) -> Result<i64, StoreError> {
        let mut products = self.products.lock().map_err(StoreError::backend)?;
        let product = products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        let next = product.stock + delta;
        if next < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                requested: -delta,
                available: product.stock,
            });
        }
        product.stock = next;
        product.updated_at = Utc::now();
        Ok(next)
    }
}
