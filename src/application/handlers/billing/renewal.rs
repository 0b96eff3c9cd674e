//! Renewal step shared by free activation, paid notify and reconcile.

use crate::domain::billing::{BillingError, Order, Subscription};
use crate::domain::foundation::Timestamp;
use crate::ports::BillingUnitOfWork;

/// Extends the order owner's subscription by one period of the order's plan.
///
/// Runs inside the caller's unit of work: locks the user's subscription slot,
/// stacks onto a live subscription or starts fresh, and upserts the row.
pub(crate) async fn apply_renewal(
    uow: &mut dyn BillingUnitOfWork,
    order: &Order,
    now: Timestamp,
) -> Result<Subscription, BillingError> {
    let plan = uow
        .find_plan(&order.plan_id)
        .await?
        .ok_or(BillingError::PlanNotFound(order.plan_id))?;

    let existing = uow.lock_subscription(&order.user_id).await?;
    let subscription = Subscription::grant(
        existing,
        order.user_id.clone(),
        plan.id,
        Some(order.id),
        plan.period,
        now,
    )?;
    uow.save_subscription(&subscription).await?;

    tracing::info!(
        user_id = %order.user_id,
        order_number = %order.order_number,
        expires_at = %subscription.expires_at.as_datetime(),
        "subscription extended"
    );
    Ok(subscription)
}
