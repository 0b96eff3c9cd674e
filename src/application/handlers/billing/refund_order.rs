//! RefundOrderHandler - Command handler for refunding a paid order.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Order, OrderStatus};
use crate::domain::foundation::{OrderId, Timestamp};
use crate::ports::{BillingStore, PaymentGateway, PaymentSettingsProvider, RefundRequest};

#[derive(Debug, Clone)]
pub struct RefundOrderCommand {
    pub order_id: OrderId,
    /// Operator note, logged with the refund.
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RefundOrderResult {
    pub order: Order,
    /// Whether a subscription row was canceled along with the refund.
    pub subscription_canceled: bool,
}

/// Handler for refunds.
///
/// The order row stays locked while the gateway is called, so two refunds of
/// one order cannot both reach the gateway. A gateway failure rolls back and
/// leaves the order paid.
pub struct RefundOrderHandler {
    store: Arc<dyn BillingStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl RefundOrderHandler {
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

    pub async fn handle(&self, cmd: RefundOrderCommand) -> Result<RefundOrderResult, BillingError> {
        let settings = self.settings.payment_settings().await?;
        let mut uow = self.store.begin().await?;

        let Some(mut order) = uow.lock_order(&cmd.order_id).await? else {
            uow.rollback().await?;
            return Err(BillingError::OrderNotFound(cmd.order_id.to_string()));
        };
        if order.status != OrderStatus::Paid {
            uow.rollback().await?;
            return Err(BillingError::InvalidState {
                order: order.order_number.to_string(),
                status: order.status.as_str().to_string(),
                required: "paid",
            });
        }
        let Some(trade_number) = order.trade_number.clone() else {
            uow.rollback().await?;
            return Err(BillingError::MissingTradeNumber(order.order_number.to_string()));
        };

        let request = RefundRequest {
            trade_number,
            amount: order.amount,
        };
        if let Err(e) = self.gateway.refund(&settings, &request).await {
            uow.rollback().await?;
            tracing::error!(
                order_number = %order.order_number,
                trade_no = %request.trade_number,
                error = %e,
                "gateway refund failed"
            );
            return Err(e.into());
        }

        let now = Timestamp::now();
        order.mark_refunded(now)?;
        uow.update_order(&order).await?;

        let subscription_canceled = match uow.lock_subscription(&order.user_id).await? {
            Some(mut subscription) => {
                subscription.cancel(now);
                uow.save_subscription(&subscription).await?;
                true
            }
            None => false,
        };

        if let Err(e) = uow.commit().await {
            // The gateway already paid the money back; the order needs manual repair.
            tracing::error!(
                order_number = %order.order_number,
                trade_no = %request.trade_number,
                error = %e,
                "refund accepted by gateway but not recorded"
            );
            return Err(e.into());
        }

        tracing::info!(
            order_number = %order.order_number,
            user_id = %order.user_id,
            reason = %cmd.reason,
            "order refunded"
        );
        Ok(RefundOrderResult {
            order,
            subscription_canceled,
        })
    }
}
