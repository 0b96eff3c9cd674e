//! Order aggregate and its payment lifecycle.
//!
//! An order is one purchase attempt. It starts `Pending`, becomes `Paid` once
//! the gateway confirms payment, and can later be `Refunded`. A pending order
//! that is superseded by a fresh submission is `Closed` and never paid.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::money::Money;
use super::plan::Plan;
use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PlanId, StateMachine, Timestamp, UserId, ValidationError,
};

const ORDER_NUMBER_PREFIX: &str = "RD";
const ORDER_NUMBER_MAX_LEN: usize = 64;
const USER_SEGMENT_MAX_LEN: usize = 24;
const RANDOM_SUFFIX_LEN: usize = 6;

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, waiting for the gateway.
    Pending,
    /// Gateway confirmed payment.
    Paid,
    /// Payment returned through the gateway.
    Refunded,
    /// Superseded before payment.
    Closed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "refunded" => Ok(OrderStatus::Refunded),
            "closed" => Ok(OrderStatus::Closed),
            other => Err(ValidationError::invalid_format(
                "order_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Closed) | (Paid, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Paid, Closed],
            Paid => vec![Refunded],
            Refunded | Closed => vec![],
        }
    }
}

/// Externally visible order number shared with the gateway.
///
/// Layout: `RD` + `YYYYMMDDhhmmss` + user segment + 6 random characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh number for `user` at `now`.
    pub fn generate(user: &UserId, now: Timestamp) -> Self {
        let user_segment: String = user
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(USER_SEGMENT_MAX_LEN)
            .collect();
        let random = Uuid::new_v4().simple().to_string();

        Self(format!(
            "{}{}{}{}",
            ORDER_NUMBER_PREFIX,
            now.compact(),
            user_segment,
            &random[..RANDOM_SUFFIX_LEN]
        ))
    }

    /// Accepts a number received from outside (query string, callback).
    ///
    /// Only ASCII letters, digits, `-` and `_` are allowed, so the number is
    /// safe to embed in URLs and form fields unescaped.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("out_trade_no"));
        }
        if trimmed.len() > ORDER_NUMBER_MAX_LEN {
            return Err(ValidationError::out_of_range(
                "out_trade_no",
                1,
                ORDER_NUMBER_MAX_LEN as i64,
                trimmed.len() as i64,
            ));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ValidationError::invalid_format(
                "out_trade_no",
                format!("unexpected character '{}'", bad),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to do with a pending order when the user opens the payment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionDecision {
    /// Submitted moments ago; refuse without writing.
    Debounced,
    /// Already sent to the gateway once, or too old: replace it.
    Reissue,
    /// First submission: stamp and send.
    Stamp,
}

/// Order aggregate.
///
/// # Invariants
///
/// - `order_number` is unique
/// - `trade_number` is only set from a confirmed gateway payment
/// - the decimal amount shown to the gateway is always derived from `amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub order_number: OrderNumber,
    pub trade_number: Option<String>,
    pub subject: String,
    pub amount: Money,
    pub status: OrderStatus,
    pub submitted_at: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,
    /// Raw callback parameters as JSON, kept for audit.
    pub notify_payload: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a pending order for a paid plan.
    pub fn pending(user_id: UserId, plan: &Plan, now: Timestamp) -> Self {
        let order_number = OrderNumber::generate(&user_id, now);
        Self {
            id: OrderId::new(),
            user_id,
            plan_id: plan.id,
            order_number,
            trade_number: None,
            subject: plan.name.clone(),
            amount: plan.price,
            status: OrderStatus::Pending,
            submitted_at: None,
            paid_at: None,
            refunded_at: None,
            notify_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an already-paid order for a free plan.
    pub fn free_activation(user_id: UserId, plan: &Plan, now: Timestamp) -> Self {
        let mut order = Self::pending(user_id, plan, now);
        order.status = OrderStatus::Paid;
        order.paid_at = Some(now);
        order
    }

    /// Fresh pending copy carrying a new number, submitted at `now`.
    pub fn reissue(&self, now: Timestamp) -> Self {
        Self {
            id: OrderId::new(),
            user_id: self.user_id.clone(),
            plan_id: self.plan_id,
            order_number: OrderNumber::generate(&self.user_id, now),
            trade_number: None,
            subject: self.subject.clone(),
            amount: self.amount,
            status: OrderStatus::Pending,
            submitted_at: Some(now),
            paid_at: None,
            refunded_at: None,
            notify_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Decimal mirror of `amount` used in signed gateway parameters.
    pub fn amount_decimal(&self) -> String {
        self.amount.to_decimal()
    }

    /// Pending with a positive amount.
    pub fn is_payable(&self) -> bool {
        self.status == OrderStatus::Pending && self.amount.is_positive()
    }

    /// Decides how a payment-page visit at `now` treats this order.
    pub fn submission_decision(
        &self,
        now: Timestamp,
        debounce: Duration,
        stale_after: Duration,
    ) -> SubmissionDecision {
        if let Some(submitted) = self.submitted_at {
            if now.duration_since(&submitted) < debounce {
                return SubmissionDecision::Debounced;
            }
            return SubmissionDecision::Reissue;
        }
        if now.duration_since(&self.created_at) > stale_after {
            return SubmissionDecision::Reissue;
        }
        SubmissionDecision::Stamp
    }

    pub fn record_submission(&mut self, now: Timestamp) {
        self.submitted_at = Some(now);
        self.updated_at = now;
    }

    /// Records a confirmed gateway payment.
    pub fn mark_paid(
        &mut self,
        trade_number: impl Into<String>,
        payload: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Paid)?;
        self.trade_number = Some(trade_number.into());
        self.notify_payload = payload;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn close(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Closed)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_refunded(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Refunded)?;
        self.refunded_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    fn transition_to(&mut self, target: OrderStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition order from {:?} to {:?}", self.status, target),
            )
            .with_detail("order_number", self.order_number.as_str())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::renewal::BillingPeriod;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }

    fn plan(price: i64) -> Plan {
        Plan::new("monthly", "Monthly", Money::from_minor(price), BillingPeriod::months(1)).unwrap()
    }

    fn user() -> UserId {
        UserId::new("user-42").unwrap()
    }

    // ════════════════════════════════════════════════════════════════════
    // Status machine
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn pending_may_be_paid_or_closed() {
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(&OrderStatus::Closed));
        assert!(!OrderStatus::Pending.can_transition_to(&OrderStatus::Refunded));
    }

    #[test]
    fn paid_may_only_be_refunded() {
        assert_eq!(OrderStatus::Paid.valid_transitions(), vec![OrderStatus::Refunded]);
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(OrderStatus::Closed.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Refunded,
            OrderStatus::Closed,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::parse("lost").is_err());
    }

    // ════════════════════════════════════════════════════════════════════
    // Order number
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn order_number_embeds_time_and_user() {
        let number = OrderNumber::generate(&user(), now());
        let s = number.as_str();
        assert!(s.starts_with("RD20240601083000user42"));
        assert_eq!(s.len(), 2 + 14 + "user42".len() + 6);
    }

    #[test]
    fn order_numbers_differ_for_same_instant() {
        assert_ne!(OrderNumber::generate(&user(), now()), OrderNumber::generate(&user(), now()));
    }

    #[test]
    fn order_number_parse_rejects_blank_and_oversized() {
        assert!(OrderNumber::parse("  ").is_err());
        assert!(OrderNumber::parse(&"x".repeat(65)).is_err());
        assert!(OrderNumber::parse("RD1&x=2").is_err());
        assert_eq!(OrderNumber::parse(" RD1 ").unwrap().as_str(), "RD1");
    }

    // ════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn pending_order_mirrors_plan_price() {
        let order = Order::pending(user(), &plan(999), now());
        assert_eq!(order.amount_decimal(), "9.99");
        assert_eq!(order.subject, "Monthly");
        assert!(order.is_payable());
    }

    #[test]
    fn free_activation_is_paid_immediately() {
        let order = Order::free_activation(user(), &plan(0), now());
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.paid_at, Some(now()));
        assert!(!order.is_payable());
    }

    #[test]
    fn mark_paid_records_trade_number() {
        let mut order = Order::pending(user(), &plan(999), now());
        order.mark_paid("T-1", Some("{}".into()), now()).unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.trade_number.as_deref(), Some("T-1"));
        assert!(order.mark_paid("T-2", None, now()).is_err());
        assert_eq!(order.trade_number.as_deref(), Some("T-1"));
    }

    #[test]
    fn closed_order_cannot_be_paid() {
        let mut order = Order::pending(user(), &plan(999), now());
        order.close(now()).unwrap();
        let err = order.mark_paid("T-1", None, now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn refund_requires_paid() {
        let mut order = Order::pending(user(), &plan(999), now());
        assert!(order.mark_refunded(now()).is_err());
        order.mark_paid("T-1", None, now()).unwrap();
        order.mark_refunded(now()).unwrap();
        assert_eq!(order.refunded_at, Some(now()));
    }

    // ════════════════════════════════════════════════════════════════════
    // Submission decisions
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn first_submission_is_stamped() {
        let order = Order::pending(user(), &plan(999), now());
        let decision = order.submission_decision(now(), Duration::seconds(3), Duration::minutes(30));
        assert_eq!(decision, SubmissionDecision::Stamp);
    }

    #[test]
    fn rapid_resubmission_is_debounced() {
        let mut order = Order::pending(user(), &plan(999), now());
        order.record_submission(now());
        let decision = order.submission_decision(now().plus_secs(2), Duration::seconds(3), Duration::minutes(30));
        assert_eq!(decision, SubmissionDecision::Debounced);
    }

    #[test]
    fn later_resubmission_is_reissued() {
        let mut order = Order::pending(user(), &plan(999), now());
        order.record_submission(now());
        let decision = order.submission_decision(now().plus_secs(3), Duration::seconds(3), Duration::minutes(30));
        assert_eq!(decision, SubmissionDecision::Reissue);
    }

    #[test]
    fn stale_unsubmitted_order_is_reissued() {
        let order = Order::pending(user(), &plan(999), now());
        let decision = order.submission_decision(now().plus_secs(31 * 60), Duration::seconds(3), Duration::minutes(30));
        assert_eq!(decision, SubmissionDecision::Reissue);
    }

    #[test]
    fn reissue_keeps_amount_but_not_identity() {
        let mut original = Order::pending(user(), &plan(999), now());
        original.record_submission(now());
        let later = now().plus_secs(60);
        let fresh = original.reissue(later);

        assert_ne!(fresh.id, original.id);
        assert_ne!(fresh.order_number, original.order_number);
        assert_eq!(fresh.amount, original.amount);
        assert_eq!(fresh.subject, original.subject);
        assert_eq!(fresh.submitted_at, Some(later));
        assert_eq!(fresh.status, OrderStatus::Pending);
    }
}
