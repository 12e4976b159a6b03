use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use merx_core::payment::GatewayError;
use merx_core::repository::{OrderStore, PaymentStore};
use merx_core::{DomainError, DomainResult};
use merx_shared::models::events::{OrderCancelledEvent, OrderPaidEvent, PaymentRefundedEvent};
use merx_shared::models::order::{FulfillmentStatus, Order};
use merx_shared::models::payment::{NewPayment, Payment, PaymentStatus};

use crate::gateway::GatewayRegistry;
use crate::notify::Notifier;

/// Orchestrates the charge/settle/notify sequence and the compensating
/// flows (cancellation, refund). Persisted state changes are transactional
/// in the store; the one deliberate gap is a successful charge whose
/// settlement write fails, which surfaces as `PostChargePersistence` and is
/// never reversed at the gateway automatically.
pub struct SettlementWorkflow {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentStore>,
    gateways: GatewayRegistry,
    notifier: Arc<Notifier>,
    charge_timeout: Duration,
}

impl SettlementWorkflow {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentStore>,
        gateways: GatewayRegistry,
        notifier: Arc<Notifier>,
        charge_timeout: Duration,
    ) -> Self {
        Self { orders, payments, gateways, notifier, charge_timeout }
    }

    /// Charge the order through the named gateway and settle. A decline or
    /// timeout propagates with no state mutated.
    pub async fn process_payment(
        &self,
        order_id: i64,
        gateway_name: &str,
    ) -> DomainResult<(Order, Payment)> {
        let gateway = self.gateways.get(gateway_name)?;

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {order_id}")))?;

        if order.payment_status == PaymentStatus::Completed {
            return Err(DomainError::StateConflict(format!("order {order_id} is already paid")));
        }
        if order.fulfillment_status == FulfillmentStatus::Cancelled {
            return Err(DomainError::StateConflict(format!("order {order_id} is cancelled")));
        }

        let receipt = match tokio::time::timeout(self.charge_timeout, gateway.charge(&order)).await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(GatewayError::Timeout.into()),
        };

        let new_payment = NewPayment {
            order_id,
            transaction_id: receipt.transaction_id.clone(),
            gateway: gateway.name().to_string(),
            amount_cents: order.total_cents,
            gateway_response: Some(receipt.response),
        };

        // The charge has happened; from here on a persistence failure is
        // surfaced for manual reconciliation, not rolled back.
        let (order, payment) = self
            .orders
            .settle_payment(order_id, &new_payment)
            .await
            .map_err(|source| DomainError::PostChargePersistence {
                order_id,
                gateway: gateway.name().to_string(),
                transaction_id: receipt.transaction_id.clone(),
                source,
            })?;

        let event = OrderPaidEvent {
            order_id,
            customer_id: order.customer_id.clone(),
            gateway: payment.gateway.clone(),
            amount_cents: payment.amount_cents,
            timestamp: Utc::now().timestamp(),
        };
        tracing::info!(
            target: "merx::telemetry",
            event = %serde_json::to_string(&event).unwrap_or_default(),
            "order paid"
        );

        if let Err(err) = self.notifier.payment_status_changed(&order).await {
            tracing::warn!(order_id, %err, "failed to record payment notification");
        }

        Ok((order, payment))
    }

    /// Cancel an order that has not shipped: release every reserved line
    /// item and set fulfillment to CANCELLED, as one transaction.
    pub async fn cancel_order(&self, order_id: i64) -> DomainResult<Order> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {order_id}")))?;

        if !order.fulfillment_status.can_become(FulfillmentStatus::Cancelled) {
            return Err(DomainError::StateConflict(format!(
                "order {order_id} cannot be cancelled in status {}",
                order.fulfillment_status
            )));
        }

        // The store re-checks the status inside its transaction, so a racing
        // ship/cancel cannot double-release stock.
        let cancelled = self.orders.cancel_order(order_id).await?;

        let event = OrderCancelledEvent {
            order_id,
            customer_id: cancelled.customer_id.clone(),
            timestamp: Utc::now().timestamp(),
        };
        tracing::info!(
            target: "merx::telemetry",
            event = %serde_json::to_string(&event).unwrap_or_default(),
            "order cancelled"
        );

        if let Err(err) = self.notifier.order_status_changed(&cancelled).await {
            tracing::warn!(order_id, %err, "failed to record order notification");
        }

        Ok(cancelled)
    }

    /// Refund a completed payment, fully by default or partially up to the
    /// original amount.
    pub async fn process_refund(
        &self,
        payment_id: i64,
        amount_cents: Option<i64>,
    ) -> DomainResult<Payment> {
        let payment = self
            .payments
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("payment {payment_id}")))?;

        if payment.status != PaymentStatus::Completed {
            return Err(DomainError::Validation(format!(
                "payment {payment_id} is {} and cannot be refunded",
                payment.status
            )));
        }

        let amount = amount_cents.unwrap_or(payment.amount_cents);
        if amount <= 0 {
            return Err(DomainError::Validation("refund amount must be positive".into()));
        }
        if amount > payment.amount_cents {
            return Err(DomainError::Validation(format!(
                "refund of {amount} exceeds original charge of {}",
                payment.amount_cents
            )));
        }

        let transaction_id = payment.transaction_id.clone().ok_or_else(|| {
            DomainError::StateConflict(format!("payment {payment_id} has no gateway transaction"))
        })?;

        let gateway = self.gateways.get(&payment.gateway)?;
        let refund = match tokio::time::timeout(
            self.charge_timeout,
            gateway.refund(&transaction_id, amount),
        )
        .await
        {
            Ok(Ok(refund)) => refund,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(GatewayError::Timeout.into()),
        };

        let refunded = self.payments.mark_refunded(payment_id).await.map_err(|source| {
            DomainError::PostChargePersistence {
                order_id: payment.order_id,
                gateway: payment.gateway.clone(),
                transaction_id: refund.refund_id.clone(),
                source,
            }
        })?;

        let event = PaymentRefundedEvent {
            payment_id,
            order_id: refunded.order_id,
            amount_cents: refund.amount_cents,
            timestamp: Utc::now().timestamp(),
        };
        tracing::info!(
            target: "merx::telemetry",
            event = %serde_json::to_string(&event).unwrap_or_default(),
            "payment refunded"
        );

        if let Ok(Some(order)) = self.orders.get_order(refunded.order_id).await {
            if let Err(err) = self.notifier.payment_status_changed(&order).await {
                tracing::warn!(order_id = order.id, %err, "failed to record payment notification");
            }
        }

        Ok(refunded)
    }

    /// Void a payment at the gateway and mark the record cancelled. The
    /// order's own payment status is left untouched.
    pub async fn cancel_payment(&self, payment_id: i64) -> DomainResult<Payment> {
        let payment = self
            .payments
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("payment {payment_id}")))?;

        if !payment.status.record_can_become(PaymentStatus::Cancelled) {
            return Err(DomainError::StateConflict(format!(
                "payment {payment_id} is {} and cannot be cancelled",
                payment.status
            )));
        }

        if let Some(transaction_id) = &payment.transaction_id {
            let gateway = self.gateways.get(&payment.gateway)?;
            match tokio::time::timeout(self.charge_timeout, gateway.cancel(transaction_id)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(GatewayError::Timeout.into()),
            }
        }

        Ok(self.payments.mark_cancelled(payment_id).await?)
    }
}
