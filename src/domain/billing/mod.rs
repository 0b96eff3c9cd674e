//! Billing domain - plans, orders, subscriptions and the gateway protocol.
//!
//! # Module Structure
//!
//! - `money` - integer minor units and the decimal codec
//! - `renewal` - calendar-aware period arithmetic
//! - `signature` - MD5 request signing and callback verification
//! - `notification` - typed payment callbacks
//! - `order` / `subscription` / `plan` - aggregates

mod errors;
mod money;
mod notification;
mod order;
mod plan;
mod renewal;
mod signature;
mod subscription;

pub use errors::{BillingError, ErrorCategory};
pub use money::{decimal_to_minor, minor_to_decimal, Money, MoneyError};
pub use notification::{fields, GatewayParams, PaymentNotification, TradeStatus, TRADE_SUCCESS};
pub use order::{Order, OrderNumber, OrderStatus, SubmissionDecision};
pub use plan::Plan;
pub use renewal::{extend, BillingPeriod, PeriodUnit, RenewalOverflow};
pub use signature::{SignatureEngine, SIGN_FIELD, SIGN_TYPE_FIELD, SIGN_TYPE_MD5};
pub use subscription::{Subscription, SubscriptionStatus};

impl From<RenewalOverflow> for BillingError {
    fn from(err: RenewalOverflow) -> Self {
        BillingError::validation("period", err.to_string())
    }
}
