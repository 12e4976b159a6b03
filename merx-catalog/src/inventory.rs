use std::sync::Arc;

use uuid::Uuid;

use merx_core::repository::CatalogStore;
use merx_core::{DomainError, DomainResult};

/// Atomic stock movements. The check-then-decrement lives in the store's
/// conditional update, so concurrent reservations against the same product
/// can never oversell.
pub struct InventoryLedger {
    store: Arc<dyn CatalogStore>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Decrement available stock in anticipation of an order. Returns the
    /// new stock level; an insufficient balance leaves stock unchanged and
    /// reports the available quantity.
    pub async fn reserve(&self, product_id: Uuid, quantity: i64) -> DomainResult<i64> {
        if quantity < 1 {
            return Err(DomainError::Validation("reservation quantity must be at least 1".into()));
        }
        let remaining = self.store.adjust_stock(product_id, -quantity).await?;
        tracing::debug!(%product_id, quantity, remaining, "stock reserved");
        Ok(remaining)
    }

    /// Inverse of [`reserve`](Self::reserve), used on cancellation.
    pub async fn release(&self, product_id: Uuid, quantity: i64) -> DomainResult<i64> {
        if quantity < 1 {
            return Err(DomainError::Validation("release quantity must be at least 1".into()));
        }
        let remaining = self.store.adjust_stock(product_id, quantity).await?;
        tracing::debug!(%product_id, quantity, remaining, "stock released");
        Ok(remaining)
    }

    /// Signed admin adjustment (restock or shrinkage correction).
    pub async fn adjust(&self, product_id: Uuid, delta: i64) -> DomainResult<i64> {
        if delta == 0 {
            return Err(DomainError::Validation("stock adjustment must be non-zero".into()));
        }
        Ok(self.store.adjust_stock(product_id, delta).await?)
    }
}
