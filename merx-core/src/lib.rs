pub mod error;
pub mod identity;
pub mod payment;
pub mod repository;

pub use error::{DomainError, StoreError};
pub use identity::{AuthContext, Role};
pub use payment::{ChargeReceipt, ChargeState, GatewayError, PaymentGateway, RefundReceipt};

pub type DomainResult<T> = Result<T, DomainError>;
