use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use merx_core::payment::{ChargeReceipt, ChargeState, GatewayError, PaymentGateway, RefundReceipt};
use merx_core::{DomainError, DomainResult};
use merx_shared::models::order::Order;

/// Providers keyed by configured name. Unknown names fail at lookup, and
/// misconfigured names fail at construction; neither is ever a panic.
pub struct GatewayRegistry {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self { gateways: HashMap::new() }
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.name().to_string(), gateway);
    }

    /// Build the simulated providers named in configuration.
    pub fn from_names(names: &[String], success_rate: f64) -> DomainResult<Self> {
        let mut registry = Self::new();
        for name in names {
            match name.as_str() {
                "alpha" => registry.register(Arc::new(AlphaGateway::new(success_rate))),
                "beta" => registry.register(Arc::new(BetaGateway::new(success_rate))),
                other => return Err(DomainError::UnsupportedGateway(other.to_string())),
            }
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> DomainResult<Arc<dyn PaymentGateway>> {
        self.gateways
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::UnsupportedGateway(name.to_string()))
    }
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated card processor. Charge outcome is probabilistic; everything
/// else acknowledges blindly, as the stand-in contract allows.
pub struct AlphaGateway {
    success_rate: f64,
}

impl AlphaGateway {
    pub fn new(success_rate: f64) -> Self {
        Self { success_rate }
    }
}

#[async_trait]
impl PaymentGateway for AlphaGateway {
    fn name(&self) -> &str {
        "alpha"
    }

    async fn charge(&self, order: &Order) -> Result<ChargeReceipt, GatewayError> {
        let approved = rand::thread_rng().gen_bool(self.success_rate);
        if !approved {
            return Err(GatewayError::Declined("alpha: card declined".into()));
        }
        Ok(ChargeReceipt {
            transaction_id: format!("alpha_{}", Uuid::new_v4().simple()),
            response: format!("alpha approved {} cents for order {}", order.total_cents, order.id),
        })
    }

    async fn query_status(&self, _transaction_id: &str) -> Result<ChargeState, GatewayError> {
        Ok(ChargeState::Succeeded)
    }

    async fn cancel(&self, _transaction_id: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount_cents: i64,
    ) -> Result<RefundReceipt, GatewayError> {
        Ok(RefundReceipt {
            refund_id: format!("alpha_rf_{transaction_id}"),
            amount_cents,
        })
    }
}

/// Second simulated provider with its own reference format.
pub struct BetaGateway {
    success_rate: f64,
}

impl BetaGateway {
    pub fn new(success_rate: f64) -> Self {
        Self { success_rate }
    }
}

#[async_trait]
impl PaymentGateway for BetaGateway {
    fn name(&self) -> &str {
        "beta"
    }

    async fn charge(&self, order: &Order) -> Result<ChargeReceipt, GatewayError> {
        let approved = rand::thread_rng().gen_bool(self.success_rate);
        if !approved {
            return Err(GatewayError::Declined("beta: payment rejected".into()));
        }
        Ok(ChargeReceipt {
            transaction_id: format!("B-{:>08}-{}", order.id, Uuid::new_v4().simple()),
            response: format!("beta: settled order {} ({} cents)", order.id, order.total_cents),
        })
    }

    async fn query_status(&self, _transaction_id: &str) -> Result<ChargeState, GatewayError> {
        Ok(ChargeState::Succeeded)
    }

    async fn cancel(&self, _transaction_id: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount_cents: i64,
    ) -> Result<RefundReceipt, GatewayError> {
        Ok(RefundReceipt {
            refund_id: format!("B-RF-{transaction_id}"),
            amount_cents,
        })
    }
}

/// Deterministic double for tests: always approves or always declines.
pub struct FixedGateway {
    name: String,
    approve: bool,
}

impl FixedGateway {
    pub fn approving(name: &str) -> Self {
        Self { name: name.to_string(), approve: true }
    }

    pub fn declining(name: &str) -> Self {
        Self { name: name.to_string(), approve: false }
    }
}

#[async_trait]
impl PaymentGateway for FixedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn charge(&self, order: &Order) -> Result<ChargeReceipt, GatewayError> {
        if !self.approve {
            return Err(GatewayError::Declined(format!("{}: forced decline", self.name)));
        }
        Ok(ChargeReceipt {
            transaction_id: format!("{}_txn_{}", self.name, order.id),
            response: format!("{}: forced approval", self.name),
        })
    }

    async fn query_status(&self, _transaction_id: &str) -> Result<ChargeState, GatewayError> {
        Ok(if self.approve { ChargeState::Succeeded } else { ChargeState::Failed })
    }

    async fn cancel(&self, _transaction_id: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount_cents: i64,
    ) -> Result<RefundReceipt, GatewayError> {
        if !self.approve {
            return Err(GatewayError::Provider(format!("{}: refund unavailable", self.name)));
        }
        Ok(RefundReceipt {
            refund_id: format!("{}_rf_{transaction_id}", self.name),
            amount_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_gateway_fails_lookup() {
        let registry = GatewayRegistry::from_names(
            &["alpha".to_string(), "beta".to_string()],
            0.9,
        )
        .unwrap();

        assert!(registry.get("alpha").is_ok());
        assert!(registry.get("beta").is_ok());
        assert!(matches!(
            registry.get("gamma"),
            Err(DomainError::UnsupportedGateway(name)) if name == "gamma"
        ));
    }

    #[test]
    fn unknown_gateway_fails_construction() {
        let err = GatewayRegistry::from_names(&["stripe".to_string()], 0.9).err().unwrap();
        assert!(matches!(err, DomainError::UnsupportedGateway(name) if name == "stripe"));
    }
}
