use std::sync::Arc;

use uuid::Uuid;

use merx_core::repository::CatalogStore;
use merx_core::{DomainError, DomainResult};
use merx_shared::models::catalog::{NewProduct, Product};

/// Catalog admin operations and read-side lookups. Stock is not touched
/// here beyond the initial level; all later mutation goes through the
/// inventory ledger.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn create_product(&self, new: NewProduct) -> DomainResult<Product> {
        if new.name.trim().is_empty() {
            return Err(DomainError::Validation("product name must not be empty".into()));
        }
        if new.price_cents < 0 {
            return Err(DomainError::Validation("product price must not be negative".into()));
        }
        if new.stock < 0 {
            return Err(DomainError::Validation("initial stock must not be negative".into()));
        }

        let product = self.store.create_product(&new).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: Uuid) -> DomainResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("product {id}")))
    }

    pub async fn list_products(&self, include_inactive: bool) -> DomainResult<Vec<Product>> {
        Ok(self.store.list_products(include_inactive).await?)
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        name: Option<String>,
        price_cents: Option<i64>,
    ) -> DomainResult<Product> {
        if let Some(name) = &name {
            if name.trim().is_empty() {
                return Err(DomainError::Validation("product name must not be empty".into()));
            }
        }
        if let Some(price) = price_cents {
            if price < 0 {
                return Err(DomainError::Validation("product price must not be negative".into()));
            }
        }
        Ok(self.store.update_product(id, name, price_cents).await?)
    }

    /// Soft-deactivate; products are never hard-deleted.
    pub async fn deactivate_product(&self, id: Uuid) -> DomainResult<()> {
        self.store.deactivate_product(id).await?;
        tracing::info!(product_id = %id, "product deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryCatalog;

    #[tokio::test]
    async fn rejects_invalid_products() {
        let service = CatalogService::new(Arc::new(MemoryCatalog::default()));

        let blank = NewProduct { name: "  ".into(), price_cents: 100, stock: 1 };
        assert!(matches!(
            service.create_product(blank).await,
            Err(DomainError::Validation(_))
        ));

        let negative = NewProduct { name: "Widget".into(), price_cents: -1, stock: 1 };
        assert!(matches!(
            service.create_product(negative).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn creates_and_fetches() {
        let service = CatalogService::new(Arc::new(MemoryCatalog::default()));
        let product = service
            .create_product(NewProduct { name: "Widget".into(), price_cents: 500, stock: 10 })
            .await
            .unwrap();

        let fetched = service.get_product(product.id).await.unwrap();
        assert_eq!(fetched.name, "Widget");
        assert_eq!(fetched.stock, 10);

        let missing = service.get_product(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(DomainError::NotFound(_))));
    }
}
