//! CreateOrderHandler - Command handler for starting a plan purchase.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Order, OrderNumber, Subscription};
use crate::domain::foundation::{PlanId, Timestamp, UserId};
use crate::ports::{BillingStore, PaymentSettingsProvider};

use super::renewal::apply_renewal;

/// Command to buy one period of a plan.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
}

#[derive(Debug, Clone)]
pub struct CreateOrderResult {
    pub order_number: OrderNumber,
    /// Local submit page for paid plans; `None` when the plan was free.
    pub pay_url: Option<String>,
    /// Set when a free plan was activated on the spot.
    pub subscription: Option<Subscription>,
    /// An existing pending order was handed back instead of a new one.
    pub reused: bool,
}

/// Handler for creating orders.
///
/// Free plans skip the gateway: the order is written as paid and the
/// subscription extended in one transaction. Paid plans reuse the user's
/// latest pending order for the same plan so the gateway never sees two
/// open orders for one purchase.
pub struct CreateOrderHandler {
    store: Arc<dyn BillingStore>,
    settings: Arc<dyn PaymentSettingsProvider>,
}

impl CreateOrderHandler {
    pub fn new(store: Arc<dyn BillingStore>, settings: Arc<dyn PaymentSettingsProvider>) -> Self {
        Self { store, settings }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, BillingError> {
        let settings = self.settings.payment_settings().await?;
        if !settings.enabled {
            return Err(BillingError::PaymentDisabled);
        }

        let plan = self
            .store
            .find_plan(&cmd.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(cmd.plan_id))?;
        if !plan.active {
            return Err(BillingError::PlanInactive(plan.id));
        }

        let now = Timestamp::now();

        if plan.is_free() {
            let order = Order::free_activation(cmd.user_id, &plan, now);
            let mut uow = self.store.begin().await?;
            uow.insert_order(&order).await?;
            let subscription = apply_renewal(uow.as_mut(), &order, now).await?;
            uow.commit().await?;

            tracing::info!(
                user_id = %order.user_id,
                order_number = %order.order_number,
                plan = %plan.code,
                "free plan activated"
            );
            return Ok(CreateOrderResult {
                order_number: order.order_number,
                pay_url: None,
                subscription: Some(subscription),
                reused: false,
            });
        }

        if let Some(existing) = self
            .store
            .find_latest_pending_order(&cmd.user_id, &plan.id)
            .await?
        {
            tracing::debug!(order_number = %existing.order_number, "reusing pending order");
            return Ok(CreateOrderResult {
                pay_url: Some(settings.pay_url(&existing.order_number)),
                order_number: existing.order_number,
                subscription: None,
                reused: true,
            });
        }

        let order = Order::pending(cmd.user_id, &plan, now);
        self.store.insert_order(&order).await?;

        tracing::info!(
            user_id = %order.user_id,
            order_number = %order.order_number,
            amount = %order.amount,
            "order created"
        );
        Ok(CreateOrderResult {
            pay_url: Some(settings.pay_url(&order.order_number)),
            order_number: order.order_number,
            subscription: None,
            reused: false,
        })
    }
}
