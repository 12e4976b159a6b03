use std::sync::Arc;
use std::time::Duration;

use merx_catalog::{CatalogService, InventoryLedger};
use merx_core::repository::{CatalogStore, NotificationStore, OrderStore, PaymentStore};
use merx_order::{GatewayRegistry, Notifier, OrderManager, SettlementWorkflow};
use merx_store::{
    Db, SqliteCatalogStore, SqliteNotificationStore, SqliteOrderStore, SqlitePaymentStore,
};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub ledger: Arc<InventoryLedger>,
    pub orders: Arc<OrderManager>,
    pub settlement: Arc<SettlementWorkflow>,
    pub notifier: Arc<Notifier>,
    pub payments: Arc<dyn PaymentStore>,
    pub auth: AuthConfig,
    pub default_gateway: Option<String>,
}

impl AppState {
    /// Wire every service onto one database. The gateway registry is
    /// injected so tests can swap in deterministic providers.
    pub fn assemble(
        db: &Db,
        gateways: GatewayRegistry,
        auth: AuthConfig,
        default_gateway: Option<String>,
        charge_timeout: Duration,
    ) -> Self {
        let catalog_store: Arc<dyn CatalogStore> =
            Arc::new(SqliteCatalogStore::new(db.pool.clone()));
        let order_store: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(db.pool.clone()));
        let payment_store: Arc<dyn PaymentStore> =
            Arc::new(SqlitePaymentStore::new(db.pool.clone()));
        let notification_store: Arc<dyn NotificationStore> =
            Arc::new(SqliteNotificationStore::new(db.pool.clone()));

        let notifier = Arc::new(Notifier::new(notification_store));
        let catalog = Arc::new(CatalogService::new(catalog_store.clone()));
        let ledger = Arc::new(InventoryLedger::new(catalog_store.clone()));
        let orders = Arc::new(OrderManager::new(
            order_store.clone(),
            catalog_store,
            notifier.clone(),
        ));
        let settlement = Arc::new(SettlementWorkflow::new(
            order_store,
            payment_store.clone(),
            gateways,
            notifier.clone(),
            charge_timeout,
        ));

        Self {
            catalog,
            ledger,
            orders,
            settlement,
            notifier,
            payments: payment_store,
            auth,
            default_gateway,
        }
    }
}
