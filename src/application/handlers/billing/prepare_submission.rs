//! PrepareSubmissionHandler - Command handler behind the payment submit page.
//!
//! The browser lands on the local submit page with an order number. Under the
//! order's row lock this handler decides whether the order may go to the
//! gateway, replaces it with a fresh one if the gateway may already know the
//! old number, and returns the signed form parameters.

use std::sync::Arc;

use crate::domain::billing::{
    fields, BillingError, GatewayParams, Order, OrderNumber, OrderStatus, SubmissionDecision,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{BillingStore, PaymentSettings, PaymentSettingsProvider};

/// Payment channel requested from the gateway; it lets the payer choose.
const PAYMENT_CHANNEL: &str = "epay";

#[derive(Debug, Clone)]
pub struct PrepareSubmissionCommand {
    pub order_number: OrderNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Post `params` to `action`.
    Ready {
        order_number: OrderNumber,
        /// Whether a fresh order replaced the requested one.
        reissued: bool,
        action: String,
        params: GatewayParams,
    },
    /// Submitted moments ago; nothing was written.
    Blocked,
    NotFound,
    /// Order is no longer pending.
    NotPayable(OrderStatus),
    /// Order amount is zero.
    InvalidAmount,
}

pub struct PrepareSubmissionHandler {
    store: Arc<dyn BillingStore>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl PrepareSubmissionHandler {
    pub fn new(store: Arc<dyn BillingStore>, settings: Arc<dyn PaymentSettingsProvider>) -> Self {
        Self { store, settings }
    }

    pub async fn handle(
        &self,
        cmd: PrepareSubmissionCommand,
    ) -> Result<SubmissionOutcome, BillingError> {
        let settings = self.settings.payment_settings().await?;
        if !settings.enabled {
            return Err(BillingError::PaymentDisabled);
        }

        let now = Timestamp::now();
        let mut uow = self.store.begin().await?;

        let Some(mut order) = uow.lock_order_by_number(&cmd.order_number).await? else {
            uow.rollback().await?;
            return Ok(SubmissionOutcome::NotFound);
        };
        if order.status != OrderStatus::Pending {
            uow.rollback().await?;
            return Ok(SubmissionOutcome::NotPayable(order.status));
        }
        if !order.amount.is_positive() {
            uow.rollback().await?;
            return Ok(SubmissionOutcome::InvalidAmount);
        }

        let (target, reissued) =
            match order.submission_decision(now, settings.submit_debounce, settings.pending_stale_after) {
                SubmissionDecision::Debounced => {
                    uow.rollback().await?;
                    tracing::debug!(order_number = %order.order_number, "submission debounced");
                    return Ok(SubmissionOutcome::Blocked);
                }
                SubmissionDecision::Reissue => {
                    let closed = uow
                        .close_pending_orders(&order.user_id, &order.plan_id, now)
                        .await?;
                    let fresh = order.reissue(now);
                    uow.insert_order(&fresh).await?;
                    tracing::info!(
                        replaced = %order.order_number,
                        order_number = %fresh.order_number,
                        closed,
                        "pending order reissued"
                    );
                    (fresh, true)
                }
                SubmissionDecision::Stamp => {
                    order.record_submission(now);
                    uow.update_order(&order).await?;
                    (order, false)
                }
            };
        uow.commit().await?;

        Ok(SubmissionOutcome::Ready {
            action: settings.submit_url(),
            params: pay_params(&settings, &target),
            order_number: target.order_number,
            reissued,
        })
    }
}

/// Signed form fields for the gateway's submit endpoint.
fn pay_params(settings: &PaymentSettings, order: &Order) -> GatewayParams {
    let mut params = GatewayParams::new();
    params.insert(fields::MERCHANT_ID.to_string(), settings.merchant_id.clone());
    params.insert(fields::PAYMENT_TYPE.to_string(), PAYMENT_CHANNEL.to_string());
    params.insert(fields::ORDER_NUMBER.to_string(), order.order_number.to_string());
    params.insert("name".to_string(), order.subject.clone());
    params.insert(fields::MONEY.to_string(), order.amount_decimal());
    if let Some(url) = &settings.notify_url {
        params.insert("notify_url".to_string(), url.clone());
    }
    if let Some(url) = &settings.return_url {
        params.insert("return_url".to_string(), url.clone());
    }
    settings.signature_engine().signed(params)
}
