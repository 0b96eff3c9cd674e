//! Applying a confirmed gateway payment to a pending order.
//!
//! Both the payment callback and the reconcile path end here, so a payment is
//! applied exactly once no matter how many times or by which route the
//! gateway reports it.

use crate::domain::billing::{BillingError, Money, OrderNumber, OrderStatus, Subscription};
use crate::domain::foundation::Timestamp;
use crate::ports::BillingStore;

use super::renewal::apply_renewal;

/// What happened to a confirmed payment report. None of these are errors;
/// the gateway is told `success` for all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Order marked paid and the subscription extended.
    Applied {
        order_number: OrderNumber,
        subscription: Subscription,
    },
    /// Order was already paid or refunded.
    AlreadyProcessed,
    /// Order had been closed in favour of a newer one.
    Superseded,
    /// Trade status was not the success sentinel.
    Ignored,
}

/// A payment report that survived the trust checks.
pub(crate) struct ConfirmedPayment<'a> {
    pub order_number: &'a OrderNumber,
    pub trade_number: &'a str,
    /// Decimal amount as reported by the gateway.
    pub money: &'a str,
    /// Audit record kept on the order.
    pub payload: String,
}

/// Marks the order paid and extends the subscription in one transaction.
///
/// # Errors
///
/// - `OrderNotFound` when the number is unknown
/// - `InvalidAmount` / `AmountMismatch` when the reported money is unreadable
///   or differs from the stored amount; the order stays pending
pub(crate) async fn settle(
    store: &dyn BillingStore,
    payment: ConfirmedPayment<'_>,
) -> Result<NotifyOutcome, BillingError> {
    let now = Timestamp::now();
    let mut uow = store.begin().await?;

    let Some(mut order) = uow.lock_order_by_number(payment.order_number).await? else {
        uow.rollback().await?;
        tracing::error!(order_number = %payment.order_number, "payment reported for unknown order");
        return Err(BillingError::OrderNotFound(payment.order_number.to_string()));
    };

    match order.status {
        OrderStatus::Paid | OrderStatus::Refunded => {
            uow.rollback().await?;
            tracing::info!(order_number = %order.order_number, "payment already processed");
            return Ok(NotifyOutcome::AlreadyProcessed);
        }
        OrderStatus::Closed => {
            uow.rollback().await?;
            tracing::warn!(order_number = %order.order_number, "payment ignored for closed order");
            return Ok(NotifyOutcome::Superseded);
        }
        OrderStatus::Pending => {}
    }

    let received = match Money::from_decimal(payment.money) {
        Ok(amount) => amount,
        Err(e) => {
            uow.rollback().await?;
            tracing::error!(order_number = %order.order_number, error = %e, "unreadable payment amount");
            return Err(BillingError::InvalidAmount(e));
        }
    };
    if received != order.amount {
        uow.rollback().await?;
        tracing::error!(
            order_number = %order.order_number,
            expected = %order.amount,
            received = %received,
            "payment amount mismatch"
        );
        return Err(BillingError::AmountMismatch {
            expected: order.amount,
            received,
        });
    }

    order.mark_paid(payment.trade_number, Some(payment.payload), now)?;
    uow.update_order(&order).await?;
    let subscription = apply_renewal(uow.as_mut(), &order, now).await?;
    uow.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        trade_no = %payment.trade_number,
        user_id = %order.user_id,
        "payment applied"
    );
    Ok(NotifyOutcome::Applied {
        order_number: order.order_number,
        subscription,
    })
}
