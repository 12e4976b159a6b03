pub mod gateway;
pub mod manager;
pub mod notify;
pub mod settlement;

pub use gateway::{FixedGateway, GatewayRegistry};
pub use manager::{OrderLine, OrderManager};
pub use notify::Notifier;
pub use settlement::SettlementWorkflow;
