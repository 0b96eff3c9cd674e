//! Per-user subscription record.
//!
//! Each user has at most one subscription row. Purchases and grants extend it
//! in place; time that is still active is never discarded.

use serde::{Deserialize, Serialize};

use super::renewal::{BillingPeriod, RenewalOverflow};
use crate::domain::foundation::{OrderId, PlanId, SubscriptionId, Timestamp, UserId, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// A user's subscription.
///
/// # Invariants
///
/// - one row per `user_id`
/// - `started_at <= expires_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    /// Order that last extended this subscription, if any.
    pub last_order_id: Option<OrderId>,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub status: SubscriptionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Active with expiry strictly after `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at.is_after(&now)
    }

    /// Applies one period of `plan_id` for `user_id` at `now`.
    ///
    /// An existing subscription that is still active keeps its start and has
    /// the period stacked onto its current expiry. Anything else (no row,
    /// expired, canceled) starts over from `now`. The result is always active.
    pub fn grant(
        existing: Option<Subscription>,
        user_id: UserId,
        plan_id: PlanId,
        order_id: Option<OrderId>,
        period: BillingPeriod,
        now: Timestamp,
    ) -> Result<Subscription, RenewalOverflow> {
        match existing {
            Some(mut current) => {
                let (start, base) = if current.is_active_at(now) {
                    (current.started_at, current.expires_at)
                } else {
                    (now, now)
                };
                current.expires_at = period.extend(base)?;
                current.started_at = start;
                current.plan_id = plan_id;
                if order_id.is_some() {
                    current.last_order_id = order_id;
                }
                current.status = SubscriptionStatus::Active;
                current.updated_at = now;
                Ok(current)
            }
            None => Ok(Subscription {
                id: SubscriptionId::new(),
                user_id,
                plan_id,
                last_order_id: order_id,
                started_at: now,
                expires_at: period.extend(now)?,
                status: SubscriptionStatus::Active,
                created_at: now,
                updated_at: now,
            }),
        }
    }

    pub fn cancel(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Canceled;
        self.updated_at = now;
    }
}
