//! ReconcileOrderHandler - Command handler that asks the gateway about a
//! pending order whose callback never arrived.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{BillingError, OrderNumber, OrderStatus};
use crate::ports::{BillingStore, PaymentGateway, PaymentSettingsProvider};

use super::settlement::{settle, ConfirmedPayment, NotifyOutcome};

#[derive(Debug, Clone)]
pub struct ReconcileOrderCommand {
    pub order_number: OrderNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOrderResult {
    pub order_number: OrderNumber,
    /// Order status after reconciliation.
    pub status: OrderStatus,
    /// Whether this call marked the order paid.
    pub applied: bool,
}

pub struct ReconcileOrderHandler {
    store: Arc<dyn BillingStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl ReconcileOrderHandler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: Arc<dyn PaymentSettingsProvider>,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileOrderCommand,
    ) -> Result<ReconcileOrderResult, BillingError> {
        let order = self
            .store
            .find_order_by_number(&cmd.order_number)
            .await?
            .ok_or_else(|| BillingError::OrderNotFound(cmd.order_number.to_string()))?;

        if order.status != OrderStatus::Pending {
            return Ok(ReconcileOrderResult {
                order_number: order.order_number,
                status: order.status,
                applied: false,
            });
        }

        let settings = self.settings.payment_settings().await?;
        let state = self.gateway.query_order(&settings, &order.order_number).await?;

        if !state.order_number.is_empty() && state.order_number != order.order_number.as_str() {
            return Err(BillingError::GatewayRejected(format!(
                "gateway answered for order {}",
                state.order_number
            )));
        }
        if !state.paid {
            tracing::debug!(order_number = %order.order_number, "gateway reports order unpaid");
            return Ok(ReconcileOrderResult {
                order_number: order.order_number,
                status: OrderStatus::Pending,
                applied: false,
            });
        }
        let trade_number = state
            .trade_number
            .clone()
            .ok_or_else(|| BillingError::MissingTradeNumber(order.order_number.to_string()))?;

        let payload = json!({
            "source": "reconcile",
            "trade_no": trade_number,
            "money": state.money,
            "type": state.payment_type,
        })
        .to_string();

        let outcome = settle(
            self.store.as_ref(),
            ConfirmedPayment {
                order_number: &order.order_number,
                trade_number: &trade_number,
                money: &state.money,
                payload,
            },
        )
        .await?;

        let applied = matches!(outcome, NotifyOutcome::Applied { .. });
        let status = match outcome {
            NotifyOutcome::Applied { .. } => OrderStatus::Paid,
            _ => self
                .store
                .find_order_by_number(&order.order_number)
                .await?
                .map(|o| o.status)
                .unwrap_or(order.status),
        };

        Ok(ReconcileOrderResult {
            order_number: order.order_number,
            status,
            applied,
        })
    }
}
