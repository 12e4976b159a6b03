pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod notification_repo;
pub mod order_repo;
pub mod payment_repo;

pub use app_config::Config;
pub use catalog_repo::SqliteCatalogStore;
pub use database::Db;
pub use notification_repo::SqliteNotificationStore;
pub use order_repo::SqliteOrderStore;
pub use payment_repo::SqlitePaymentStore;
