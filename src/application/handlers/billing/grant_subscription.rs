//! GrantSubscriptionHandler - Operator command that adds days to a user's
//! subscription without an order.

use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingPeriod, Subscription};
use crate::domain::foundation::{PlanId, Timestamp, UserId};
use crate::ports::BillingStore;

/// Upper bound on a single grant, roughly ten years.
const MAX_GRANT_DAYS: u32 = 3660;

#[derive(Debug, Clone)]
pub struct GrantSubscriptionCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub days: u32,
}

pub struct GrantSubscriptionHandler {
    store: Arc<dyn BillingStore>,
}

impl GrantSubscriptionHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Stacks `days` onto a live subscription, or starts a fresh one now.
    pub async fn handle(&self, cmd: GrantSubscriptionCommand) -> Result<Subscription, BillingError> {
        if cmd.days == 0 || cmd.days > MAX_GRANT_DAYS {
            return Err(BillingError::validation(
                "days",
                format!("must be between 1 and {}", MAX_GRANT_DAYS),
            ));
        }

        let now = Timestamp::now();
        let mut uow = self.store.begin().await?;

        let Some(plan) = uow.find_plan(&cmd.plan_id).await? else {
            uow.rollback().await?;
            return Err(BillingError::PlanNotFound(cmd.plan_id));
        };

        let existing = uow.lock_subscription(&cmd.user_id).await?;
        let subscription = Subscription::grant(
            existing,
            cmd.user_id,
            plan.id,
            None,
            BillingPeriod::days(cmd.days),
            now,
        )?;
        uow.save_subscription(&subscription).await?;
        uow.commit().await?;

        tracing::info!(
            user_id = %subscription.user_id,
            days = cmd.days,
            expires_at = %subscription.expires_at.as_datetime(),
            "subscription granted"
        );
        Ok(subscription)
    }
}
